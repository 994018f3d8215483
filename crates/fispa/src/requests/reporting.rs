use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use super::domain::{RequestId, RequestStatus};
use super::store::StoreError;

/// Read-only aggregates over the request table. No method mutates anything.
pub trait RequestReporting: Send + Sync {
    /// Statuses with no requests are absent from the map.
    fn count_by_status(&self) -> Result<BTreeMap<RequestStatus, u64>, StoreError>;

    /// Keyed by the stored neighborhood text, verbatim.
    fn count_by_neighborhood(&self) -> Result<BTreeMap<String, u64>, StoreError>;

    /// Submitters grouped by name, busiest first, ties by name.
    fn top_submitters(&self, limit: usize) -> Result<Vec<SubmitterCount>, StoreError>;

    /// Every request without its photo payload, newest id first.
    fn export_all(&self) -> Result<Vec<ExportRow>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitterCount {
    pub name: String,
    pub count: u64,
}

/// Flattened request for export. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub id: RequestId,
    #[serde(serialize_with = "plain_timestamp")]
    pub submitted_at: NaiveDateTime,
    pub name: String,
    pub national_id: String,
    pub phone: String,
    pub neighborhood: String,
    pub address: String,
    pub comment: String,
    #[serde(serialize_with = "yes_no")]
    pub has_photo: bool,
    pub status: RequestStatus,
}

fn plain_timestamp<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&value.format("%Y-%m-%d %H:%M:%S"))
}

fn yes_no<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(if *value { "yes" } else { "no" })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCountEntry {
    pub status: RequestStatus,
    pub status_label: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborhoodCountEntry {
    pub neighborhood: String,
    pub count: u64,
}

/// Numbers behind the staff dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_requests: u64,
    pub by_status: Vec<StatusCountEntry>,
    pub by_neighborhood: Vec<NeighborhoodCountEntry>,
    pub top_submitters: Vec<SubmitterCount>,
}

impl DashboardSummary {
    pub fn assemble(
        status_counts: BTreeMap<RequestStatus, u64>,
        neighborhood_counts: BTreeMap<String, u64>,
        top_submitters: Vec<SubmitterCount>,
    ) -> Self {
        let total_requests = status_counts.values().sum();

        let by_status = RequestStatus::ordered()
            .into_iter()
            .filter_map(|status| {
                status_counts.get(&status).map(|count| StatusCountEntry {
                    status,
                    status_label: status.label(),
                    count: *count,
                })
            })
            .collect();

        let mut by_neighborhood: Vec<NeighborhoodCountEntry> = neighborhood_counts
            .into_iter()
            .map(|(neighborhood, count)| NeighborhoodCountEntry {
                neighborhood,
                count,
            })
            .collect();
        // Stable sort keeps alphabetical order among equal counts.
        by_neighborhood.sort_by(|left, right| right.count.cmp(&left.count));

        Self {
            total_requests,
            by_status,
            by_neighborhood,
            top_submitters,
        }
    }

    pub fn count_for(&self, status: RequestStatus) -> u64 {
        self.by_status
            .iter()
            .find(|entry| entry.status == status)
            .map_or(0, |entry| entry.count)
    }
}
