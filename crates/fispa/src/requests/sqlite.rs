use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, Timelike};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::domain::{InvalidStatusError, NewRequest, Request, RequestId, RequestStatus};
use super::reporting::{ExportRow, RequestReporting, SubmitterCount};
use super::store::{RequestField, RequestProjection, RequestStore, StatusUpdate, StoreError};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    submitted_at TEXT NOT NULL,
    name TEXT NOT NULL,
    national_id TEXT NOT NULL,
    phone TEXT NOT NULL,
    neighborhood TEXT NOT NULL,
    address TEXT NOT NULL,
    comment TEXT,
    photo BLOB,
    status TEXT NOT NULL DEFAULT 'Open'
        CHECK(status IN ('Open', 'In Progress', 'Completed'))
)";

const REQUEST_COLUMNS: &str =
    "id, submitted_at, name, national_id, phone, neighborhood, address, comment, photo, status";

/// SQLite-backed request table. Holds only the file location; every call opens
/// its own connection and drops it before returning.
#[derive(Debug, Clone)]
pub struct SqliteRequestStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteRequestStore {
    /// Point at a database file without touching it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Point at a database file and make sure the table exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(path);
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        let connection = self.connect()?;
        connection.execute_batch(SCHEMA)?;
        debug!(path = %self.path.display(), "request table ready");
        Ok(())
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let connection = Connection::open(&self.path)?;
        connection.busy_timeout(self.busy_timeout)?;
        Ok(connection)
    }
}

impl RequestStore for SqliteRequestStore {
    fn create(&self, request: NewRequest) -> Result<Request, StoreError> {
        let now = Local::now().naive_local();
        let submitted_at = now.with_nanosecond(0).unwrap_or(now);

        let mut connection = self.connect()?;
        let transaction = connection.transaction()?;
        transaction.execute(
            "INSERT INTO requests
                (submitted_at, name, national_id, phone, neighborhood, address, comment, photo, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                submitted_at,
                request.name,
                request.national_id.as_str(),
                request.phone,
                request.neighborhood.label(),
                request.address,
                request.comment,
                request.photo,
                RequestStatus::Open,
            ],
        )?;
        let id = RequestId(transaction.last_insert_rowid());
        transaction.commit()?;

        Ok(Request {
            id,
            submitted_at,
            name: request.name,
            national_id: request.national_id.as_str().to_string(),
            phone: request.phone,
            neighborhood: request.neighborhood.label().to_string(),
            address: request.address,
            comment: request.comment,
            photo: request.photo,
            status: RequestStatus::Open,
        })
    }

    fn update_status(
        &self,
        id: RequestId,
        status: RequestStatus,
    ) -> Result<StatusUpdate, StoreError> {
        let connection = self.connect()?;
        let affected = connection.execute(
            "UPDATE requests SET status = ?1 WHERE id = ?2",
            params![status, id.0],
        )?;

        Ok(if affected == 0 {
            StatusUpdate::NoMatchingRecord
        } else {
            StatusUpdate::Updated
        })
    }

    fn get(&self, id: RequestId) -> Result<Request, StoreError> {
        let connection = self.connect()?;
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?1");
        connection
            .query_row(&sql, params![id.0], request_from_row)
            .optional()?
            .ok_or(StoreError::NotFound(id))
    }

    fn list_all(&self) -> Result<Vec<Request>, StoreError> {
        let connection = self.connect()?;
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM requests ORDER BY id");
        let mut statement = connection.prepare(&sql)?;
        let requests = statement
            .query_map([], request_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    fn list_projection(
        &self,
        fields: &[RequestField],
    ) -> Result<Vec<RequestProjection>, StoreError> {
        let mut selected: Vec<RequestField> = Vec::with_capacity(fields.len());
        for field in fields {
            if !selected.contains(field) {
                selected.push(*field);
            }
        }

        let columns = if selected.is_empty() {
            // Still one projection per row, just an empty one.
            "id".to_string()
        } else {
            selected
                .iter()
                .map(|field| field.column())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let connection = self.connect()?;
        let sql = format!("SELECT {columns} FROM requests ORDER BY id");
        let mut statement = connection.prepare(&sql)?;
        let projections = statement
            .query_map([], |row| projection_from_row(row, &selected))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projections)
    }
}

impl RequestReporting for SqliteRequestStore {
    fn count_by_status(&self) -> Result<BTreeMap<RequestStatus, u64>, StoreError> {
        let connection = self.connect()?;
        let mut statement =
            connection.prepare("SELECT status, COUNT(*) FROM requests GROUP BY status")?;
        let counts = statement
            .query_map([], |row| {
                Ok((row.get::<_, RequestStatus>(0)?, count_column(row, 1)?))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(counts)
    }

    fn count_by_neighborhood(&self) -> Result<BTreeMap<String, u64>, StoreError> {
        let connection = self.connect()?;
        let mut statement = connection
            .prepare("SELECT neighborhood, COUNT(*) FROM requests GROUP BY neighborhood")?;
        let counts = statement
            .query_map([], |row| Ok((row.get::<_, String>(0)?, count_column(row, 1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(counts)
    }

    fn top_submitters(&self, limit: usize) -> Result<Vec<SubmitterCount>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT name, COUNT(*) AS total FROM requests
             GROUP BY name
             ORDER BY total DESC, name ASC
             LIMIT ?1",
        )?;
        let submitters = statement
            .query_map(params![limit], |row| {
                Ok(SubmitterCount {
                    name: row.get(0)?,
                    count: count_column(row, 1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(submitters)
    }

    fn export_all(&self) -> Result<Vec<ExportRow>, StoreError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT id, submitted_at, name, national_id, phone, neighborhood, address,
                    comment, photo IS NOT NULL, status
             FROM requests
             ORDER BY id DESC",
        )?;
        let rows = statement
            .query_map([], |row| {
                Ok(ExportRow {
                    id: RequestId(row.get(0)?),
                    submitted_at: row.get(1)?,
                    name: row.get(2)?,
                    national_id: row.get(3)?,
                    phone: row.get(4)?,
                    neighborhood: row.get(5)?,
                    address: row.get(6)?,
                    comment: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                    has_photo: row.get(8)?,
                    status: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<Request> {
    Ok(Request {
        id: RequestId(row.get(0)?),
        submitted_at: row.get::<_, NaiveDateTime>(1)?,
        name: row.get(2)?,
        national_id: row.get(3)?,
        phone: row.get(4)?,
        neighborhood: row.get(5)?,
        address: row.get(6)?,
        comment: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        photo: row.get(8)?,
        status: row.get(9)?,
    })
}

fn projection_from_row(
    row: &Row<'_>,
    fields: &[RequestField],
) -> rusqlite::Result<RequestProjection> {
    let mut projection = RequestProjection::default();
    for (index, field) in fields.iter().enumerate() {
        match field {
            RequestField::Id => projection.id = Some(RequestId(row.get(index)?)),
            RequestField::SubmittedAt => projection.submitted_at = Some(row.get(index)?),
            RequestField::Name => projection.name = Some(row.get(index)?),
            RequestField::NationalId => projection.national_id = Some(row.get(index)?),
            RequestField::Phone => projection.phone = Some(row.get(index)?),
            RequestField::Neighborhood => projection.neighborhood = Some(row.get(index)?),
            RequestField::Address => projection.address = Some(row.get(index)?),
            RequestField::Comment => {
                projection.comment = Some(row.get::<_, Option<String>>(index)?.unwrap_or_default())
            }
            RequestField::Photo => projection.photo = Some(row.get(index)?),
            RequestField::Status => projection.status = Some(row.get(index)?),
        }
    }
    Ok(projection)
}

fn count_column(row: &Row<'_>, index: usize) -> rusqlite::Result<u64> {
    let count: i64 = row.get(index)?;
    Ok(u64::try_from(count).unwrap_or_default())
}

impl ToSql for RequestStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.label()))
    }
}

impl FromSql for RequestStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let label = value.as_str()?;
        RequestStatus::from_label(label)
            .ok_or_else(|| FromSqlError::Other(Box::new(InvalidStatusError(label.to_string()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::domain::{NationalId, Neighborhood};
    use tempfile::TempDir;

    fn scratch_store() -> (TempDir, SqliteRequestStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SqliteRequestStore::open(dir.path().join("requests.db")).expect("store opens");
        (dir, store)
    }

    fn new_request(name: &str) -> NewRequest {
        NewRequest {
            name: name.to_string(),
            national_id: NationalId("12345678900".to_string()),
            phone: "61999999999".to_string(),
            neighborhood: Neighborhood::Centro,
            address: "Rua A, 10".to_string(),
            comment: String::new(),
            photo: None,
        }
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let (_dir, store) = scratch_store();
        store.create(new_request("Ana")).expect("insert");
        store.ensure_schema().expect("second schema pass");
        assert_eq!(store.list_all().expect("list").len(), 1);
    }

    #[test]
    fn ids_are_not_reused_after_manual_deletion() {
        let (_dir, store) = scratch_store();
        let first = store.create(new_request("Ana")).expect("insert");
        Connection::open(store.path())
            .and_then(|connection| {
                connection.execute("DELETE FROM requests WHERE id = ?1", params![first.id.0])
            })
            .expect("delete succeeds");

        let second = store.create(new_request("Bob")).expect("insert");
        assert!(second.id > first.id);
    }

    #[test]
    fn check_constraint_rejects_unknown_status_labels() {
        let (_dir, store) = scratch_store();
        let request = store.create(new_request("Ana")).expect("insert");

        let result = Connection::open(store.path()).and_then(|connection| {
            connection.execute(
                "UPDATE requests SET status = 'Archived' WHERE id = ?1",
                params![request.id.0],
            )
        });
        assert!(result.is_err());
    }

    #[test]
    fn legacy_rows_without_comment_or_photo_read_back() {
        let (_dir, store) = scratch_store();
        Connection::open(store.path())
            .and_then(|connection| {
                connection.execute(
                    "INSERT INTO requests (submitted_at, name, national_id, phone, neighborhood, address)
                     VALUES ('2024-11-02 08:15:00', 'Cid', '98765432100', '6133333333', 'Jardim Antigo', 'Rua B, 5')",
                    [],
                )
            })
            .expect("legacy insert");

        let requests = store.list_all().expect("list");
        assert_eq!(requests.len(), 1);
        let legacy = &requests[0];
        assert_eq!(legacy.comment, "");
        assert!(!legacy.has_photo());
        assert_eq!(legacy.status, RequestStatus::Open);
        assert_eq!(legacy.neighborhood, "Jardim Antigo");
        assert_eq!(
            legacy.submitted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-11-02 08:15:00"
        );
    }

    #[test]
    fn empty_projection_yields_one_entry_per_row() {
        let (_dir, store) = scratch_store();
        store.create(new_request("Ana")).expect("insert");
        store.create(new_request("Bob")).expect("insert");

        let projections = store.list_projection(&[]).expect("projection");
        assert_eq!(projections, vec![RequestProjection::default(); 2]);
    }

    #[test]
    fn missing_directory_surfaces_as_persistence_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SqliteRequestStore::new(dir.path().join("absent").join("requests.db"));
        assert!(matches!(
            store.list_all(),
            Err(StoreError::Persistence(_))
        ));
    }
}
