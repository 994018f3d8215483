use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Store-assigned identifier for a citizen request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub i64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle marker. Any value may overwrite any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "Open")]
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::Open => "Open",
            RequestStatus::InProgress => "In Progress",
            RequestStatus::Completed => "Completed",
        }
    }

    pub const fn ordered() -> [RequestStatus; 3] {
        [
            RequestStatus::Open,
            RequestStatus::InProgress,
            RequestStatus::Completed,
        ]
    }

    /// Exact match against the stored label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|status| status.label() == label)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Operator input is matched case-insensitively, and `_`/`-` stand in for the space.
impl FromStr for RequestStatus {
    type Err = InvalidStatusError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().replace(['_', '-'], " ");
        Self::ordered()
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| InvalidStatusError(raw.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("status '{0}' is not one of Open, In Progress, Completed")]
pub struct InvalidStatusError(pub String);

/// Administrative sub-areas served by the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Neighborhood {
    AldeiaDaPaz,
    Centro,
    ParqueDasRosas,
    VilaUniao,
    Other,
}

impl Neighborhood {
    pub const fn label(self) -> &'static str {
        match self {
            Neighborhood::AldeiaDaPaz => "Aldeia da Paz",
            Neighborhood::Centro => "Centro",
            Neighborhood::ParqueDasRosas => "Parque das Rosas",
            Neighborhood::VilaUniao => "Vila União",
            Neighborhood::Other => "Other",
        }
    }

    pub const fn ordered() -> [Neighborhood; 5] {
        [
            Neighborhood::AldeiaDaPaz,
            Neighborhood::Centro,
            Neighborhood::ParqueDasRosas,
            Neighborhood::VilaUniao,
            Neighborhood::Other,
        ]
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ordered()
            .into_iter()
            .find(|neighborhood| neighborhood.label() == label)
    }
}

/// Eleven-digit citizen identifier. Only built by
/// [`normalize_and_validate_national_id`](super::validation::normalize_and_validate_national_id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NationalId(pub(crate) String);

impl NationalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NationalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw form input as typed by the resident. Nothing here has been checked yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSubmission {
    pub name: String,
    pub national_id: String,
    pub phone: String,
    pub neighborhood: String,
    pub address: String,
    pub comment: String,
    /// Uploaded image bytes, base64 encoded on the wire.
    #[serde(with = "base64_photo", skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<u8>>,
}

/// A validated request ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    pub name: String,
    pub national_id: NationalId,
    pub phone: String,
    pub neighborhood: Neighborhood,
    pub address: String,
    pub comment: String,
    /// Re-encoded JPEG. The intake path always sets it; older rows may not have one.
    pub photo: Option<Vec<u8>>,
}

/// A stored request as read back from the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: RequestId,
    pub submitted_at: NaiveDateTime,
    pub name: String,
    pub national_id: String,
    pub phone: String,
    /// Kept verbatim, even for values outside [`Neighborhood`].
    pub neighborhood: String,
    pub address: String,
    pub comment: String,
    pub photo: Option<Vec<u8>>,
    pub status: RequestStatus,
}

impl Request {
    pub fn has_photo(&self) -> bool {
        self.photo.is_some()
    }

    pub fn view(&self) -> RequestView {
        RequestView {
            id: self.id,
            submitted_at: self.submitted_at,
            name: self.name.clone(),
            national_id: self.national_id.clone(),
            phone: self.phone.clone(),
            neighborhood: self.neighborhood.clone(),
            address: self.address.clone(),
            comment: self.comment.clone(),
            has_photo: self.has_photo(),
            status: self.status,
            status_label: self.status.label(),
        }
    }
}

/// JSON-facing shape of a request, without the photo payload.
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    pub id: RequestId,
    pub submitted_at: NaiveDateTime,
    pub name: String,
    pub national_id: String,
    pub phone: String,
    pub neighborhood: String,
    pub address: String,
    pub comment: String,
    pub has_photo: bool,
    pub status: RequestStatus,
    pub status_label: &'static str,
}

mod base64_photo {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(encoded) => {
                // Browsers hand over data URLs; keep only the payload.
                let payload = encoded
                    .split_once(";base64,")
                    .map_or(encoded, |(_, payload)| payload);
                STANDARD
                    .decode(payload)
                    .map(Some)
                    .map_err(serde::de::Error::custom)
            }
        }
    }
}
