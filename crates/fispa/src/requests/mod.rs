//! Citizen road and inspection requests: intake validation, storage, status
//! updates, dashboard aggregates, and CSV export.

pub mod access;
pub mod domain;
pub mod export;
pub mod photo;
pub mod reporting;
pub mod router;
pub mod service;
pub mod sqlite;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use access::{AccessPolicy, SharedSecretPolicy, ADMIN_TOKEN_HEADER};
pub use domain::{
    InvalidStatusError, NationalId, Neighborhood, NewRequest, Request, RequestId, RequestStatus,
    RequestSubmission, RequestView,
};
pub use export::{to_csv_bytes, write_csv, ExportError, EXPORT_FILE_NAME, EXPORT_HEADERS};
pub use photo::{reencode_as_jpeg, PhotoError, PHOTO_JPEG_QUALITY};
pub use reporting::{
    DashboardSummary, ExportRow, NeighborhoodCountEntry, RequestReporting, StatusCountEntry,
    SubmitterCount,
};
pub use router::{request_router, IntakeState, MAX_SUBMISSION_BYTES};
pub use service::{
    IntakeServiceError, RequestIntakeService, StatusChangeReceipt, DEFAULT_TOP_SUBMITTERS,
};
pub use sqlite::SqliteRequestStore;
pub use store::{
    RequestField, RequestProjection, RequestStore, StatusUpdate, StoreError,
    ADMIN_LISTING_FIELDS,
};
pub use validation::{
    normalize_and_validate_national_id, validate_required, validate_submission, RequiredField,
    ValidationError, ValidationErrors, NATIONAL_ID_DIGITS,
};
