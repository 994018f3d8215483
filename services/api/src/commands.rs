use crate::cli::StoreArgs;
use crate::infra::{apply_store_overrides, open_service};
use clap::Args;
use fispa::config::AppConfig;
use fispa::error::AppError;
use fispa::requests::{
    write_csv, DashboardSummary, RequestId, RequestIntakeService, SqliteRequestStore,
    StatusChangeReceipt, StatusUpdate, DEFAULT_TOP_SUBMITTERS,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Default)]
pub(crate) struct ExportArgs {
    /// Destination file. Writes to stdout when omitted.
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    #[command(flatten)]
    pub(crate) store: StoreArgs,
}

#[derive(Args, Debug)]
pub(crate) struct SetStatusArgs {
    /// Request id
    #[arg(long)]
    pub(crate) id: i64,
    /// New status: Open, In Progress, or Completed
    #[arg(long)]
    pub(crate) status: String,
    #[command(flatten)]
    pub(crate) store: StoreArgs,
}

#[derive(Args, Debug)]
pub(crate) struct DashboardArgs {
    /// Number of top submitters to list
    #[arg(long, default_value_t = DEFAULT_TOP_SUBMITTERS)]
    pub(crate) top: usize,
    #[command(flatten)]
    pub(crate) store: StoreArgs,
}

type DeskService = RequestIntakeService<SqliteRequestStore>;

fn service_from_config(store: StoreArgs) -> Result<std::sync::Arc<DeskService>, AppError> {
    let mut config = AppConfig::load()?;
    apply_store_overrides(&mut config, store);
    open_service(&config)
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let service = service_from_config(args.store)?;
    let exported = export_requests(&service, args.output.as_deref())?;
    if let Some(path) = &args.output {
        println!("Exported {exported} requests to {}", path.display());
    }
    Ok(())
}

pub(crate) fn run_set_status(args: SetStatusArgs) -> Result<(), AppError> {
    let service = service_from_config(args.store)?;
    let receipt = service.update_status(RequestId(args.id), &args.status)?;
    println!("{}", describe_receipt(&receipt));
    Ok(())
}

pub(crate) fn run_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    let service = service_from_config(args.store)?;
    let summary = service.dashboard(args.top)?;
    print!("{}", render_dashboard(&summary));
    Ok(())
}

/// Write the CSV export to `output` or stdout and return the row count.
pub(crate) fn export_requests(
    service: &DeskService,
    output: Option<&Path>,
) -> Result<usize, AppError> {
    let rows = service.export_rows()?;
    match output {
        Some(path) => write_csv(&rows, BufWriter::new(File::create(path)?))?,
        None => write_csv(&rows, std::io::stdout().lock())?,
    }
    Ok(rows.len())
}

pub(crate) fn describe_receipt(receipt: &StatusChangeReceipt) -> String {
    match receipt.outcome {
        StatusUpdate::Updated => format!(
            "Request {} is now {}",
            receipt.id,
            receipt.status.label()
        ),
        StatusUpdate::NoMatchingRecord => format!(
            "No request with id {}; nothing changed",
            receipt.id
        ),
    }
}

pub(crate) fn render_dashboard(summary: &DashboardSummary) -> String {
    let mut out = format!("Requests: {}\n", summary.total_requests);

    out.push_str("By status:\n");
    for entry in &summary.by_status {
        out.push_str(&format!("  - {}: {}\n", entry.status_label, entry.count));
    }

    out.push_str("By neighborhood:\n");
    for entry in &summary.by_neighborhood {
        out.push_str(&format!("  - {}: {}\n", entry.neighborhood, entry.count));
    }

    out.push_str("Top submitters:\n");
    for (rank, entry) in summary.top_submitters.iter().enumerate() {
        out.push_str(&format!("  {}. {} ({})\n", rank + 1, entry.name, entry.count));
    }
    out
}
