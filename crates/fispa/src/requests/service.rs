use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{InvalidStatusError, Request, RequestId, RequestStatus, RequestSubmission};
use super::export::{to_csv_bytes, ExportError};
use super::reporting::{DashboardSummary, ExportRow, RequestReporting};
use super::store::{
    RequestProjection, RequestStore, StatusUpdate, StoreError, ADMIN_LISTING_FIELDS,
};
use super::validation::{validate_submission, ValidationErrors};

/// Submitters shown on the dashboard unless the caller asks otherwise.
pub const DEFAULT_TOP_SUBMITTERS: usize = 5;

/// Service composing validation, storage, and reporting for the request desk.
pub struct RequestIntakeService<S> {
    store: Arc<S>,
}

impl<S> RequestIntakeService<S>
where
    S: RequestStore + RequestReporting + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Validate a resident's submission and persist it with status `Open`.
    /// Nothing is written unless every check passes.
    pub fn submit(&self, submission: RequestSubmission) -> Result<Request, IntakeServiceError> {
        let new_request = match validate_submission(submission) {
            Ok(new_request) => new_request,
            Err(errors) => {
                warn!(violations = errors.len(), "request submission rejected");
                return Err(errors.into());
            }
        };

        let stored = self.store.create(new_request)?;
        info!(
            request_id = %stored.id,
            neighborhood = %stored.neighborhood,
            "request submitted"
        );
        Ok(stored)
    }

    /// Overwrite a request's status from an operator-supplied label.
    ///
    /// An id that matches nothing is still a success; the outcome says so and a
    /// warning is logged.
    pub fn update_status(
        &self,
        id: RequestId,
        raw_status: &str,
    ) -> Result<StatusChangeReceipt, IntakeServiceError> {
        let status: RequestStatus = raw_status.parse()?;
        let outcome = self.store.update_status(id, status)?;
        match outcome {
            StatusUpdate::Updated => {
                info!(request_id = %id, status = status.label(), "request status updated")
            }
            StatusUpdate::NoMatchingRecord => {
                warn!(request_id = %id, status = status.label(), "status update matched no request")
            }
        }
        Ok(StatusChangeReceipt {
            id,
            status,
            outcome,
        })
    }

    pub fn get(&self, id: RequestId) -> Result<Request, IntakeServiceError> {
        Ok(self.store.get(id)?)
    }

    pub fn list_all(&self) -> Result<Vec<Request>, IntakeServiceError> {
        Ok(self.store.list_all()?)
    }

    /// Staff listing: id, timestamp, name, neighborhood, status.
    pub fn listing(&self) -> Result<Vec<RequestProjection>, IntakeServiceError> {
        Ok(self.store.list_projection(&ADMIN_LISTING_FIELDS)?)
    }

    pub fn dashboard(&self, top_submitters: usize) -> Result<DashboardSummary, IntakeServiceError> {
        let status_counts = self.store.count_by_status()?;
        let neighborhood_counts = self.store.count_by_neighborhood()?;
        let submitters = self.store.top_submitters(top_submitters)?;
        Ok(DashboardSummary::assemble(
            status_counts,
            neighborhood_counts,
            submitters,
        ))
    }

    pub fn export_rows(&self) -> Result<Vec<ExportRow>, IntakeServiceError> {
        Ok(self.store.export_all()?)
    }

    /// CSV bytes for every request, newest first.
    pub fn export_csv(&self) -> Result<Vec<u8>, IntakeServiceError> {
        let rows = self.export_rows()?;
        let csv = to_csv_bytes(&rows)?;
        info!(rows = rows.len(), bytes = csv.len(), "request export produced");
        Ok(csv)
    }
}

/// Result of a status overwrite, echoing the canonical status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChangeReceipt {
    pub id: RequestId,
    pub status: RequestStatus,
    pub outcome: StatusUpdate,
}

/// Error raised by the request intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatusError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
