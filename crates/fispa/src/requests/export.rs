use std::io::Write;

use super::reporting::ExportRow;

/// Suggested download name for the CSV export.
pub const EXPORT_FILE_NAME: &str = "fispa_requests.csv";

/// Header line, in [`ExportRow`] field order.
pub const EXPORT_HEADERS: [&str; 10] = [
    "ID",
    "Submitted At",
    "Name",
    "National ID",
    "Phone",
    "Neighborhood",
    "Address",
    "Comment",
    "Has Photo",
    "Status",
];

const EXPORT_DELIMITER: u8 = b';';

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv serialization failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv output failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Write rows as semicolon-separated UTF-8 CSV. The header is always written,
/// even when there are no rows.
pub fn write_csv<W: Write>(rows: &[ExportRow], writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(EXPORT_DELIMITER)
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(EXPORT_HEADERS)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_bytes(rows: &[ExportRow]) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    write_csv(rows, &mut buffer)?;
    Ok(buffer)
}
