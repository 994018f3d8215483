use chrono::NaiveDateTime;
use serde::Serialize;

use super::domain::{NewRequest, Request, RequestId, RequestStatus};

/// Columns of the request table that can be selected individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestField {
    Id,
    SubmittedAt,
    Name,
    NationalId,
    Phone,
    Neighborhood,
    Address,
    Comment,
    Photo,
    Status,
}

impl RequestField {
    pub const fn column(self) -> &'static str {
        match self {
            RequestField::Id => "id",
            RequestField::SubmittedAt => "submitted_at",
            RequestField::Name => "name",
            RequestField::NationalId => "national_id",
            RequestField::Phone => "phone",
            RequestField::Neighborhood => "neighborhood",
            RequestField::Address => "address",
            RequestField::Comment => "comment",
            RequestField::Photo => "photo",
            RequestField::Status => "status",
        }
    }
}

/// Columns shown on the staff listing; the photo stays on disk.
pub const ADMIN_LISTING_FIELDS: [RequestField; 5] = [
    RequestField::Id,
    RequestField::SubmittedAt,
    RequestField::Name,
    RequestField::Neighborhood,
    RequestField::Status,
];

/// Partial request holding only the columns that were asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestProjection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Outer `None`: not selected. `Some(None)`: selected, no photo stored.
    #[serde(skip)]
    pub photo: Option<Option<Vec<u8>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,
}

/// Whether a status overwrite touched a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusUpdate {
    Updated,
    NoMatchingRecord,
}

/// Durable storage for citizen requests.
///
/// Implementations acquire their storage handle per call and release it before
/// returning; nothing is held between operations.
pub trait RequestStore: Send + Sync {
    /// Persist a validated request with status `Open` and a fresh id.
    fn create(&self, request: NewRequest) -> Result<Request, StoreError>;

    /// Overwrite the status. An unknown id is not an error and reports
    /// [`StatusUpdate::NoMatchingRecord`].
    fn update_status(
        &self,
        id: RequestId,
        status: RequestStatus,
    ) -> Result<StatusUpdate, StoreError>;

    fn get(&self, id: RequestId) -> Result<Request, StoreError>;

    /// Every request, oldest first.
    fn list_all(&self) -> Result<Vec<Request>, StoreError>;

    /// Every request, oldest first, restricted to `fields`.
    fn list_projection(&self, fields: &[RequestField])
        -> Result<Vec<RequestProjection>, StoreError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request {0} not found")]
    NotFound(RequestId),
    #[error("storage failure: {0}")]
    Persistence(#[from] rusqlite::Error),
}
