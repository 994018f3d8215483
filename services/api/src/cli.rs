use crate::commands::{
    run_dashboard, run_export, run_set_status, DashboardArgs, ExportArgs, SetStatusArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use fispa::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "FISPA Request Desk",
    about = "Run the road and inspection request desk or manage requests from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Staff operations on stored requests
    Requests {
        #[command(subcommand)]
        command: RequestsCommand,
    },
    /// Print status, neighborhood, and submitter totals
    Dashboard(DashboardArgs),
}

#[derive(Subcommand, Debug)]
enum RequestsCommand {
    /// Write every request as semicolon-separated CSV, newest first
    Export(ExportArgs),
    /// Overwrite the status of one request
    SetStatus(SetStatusArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) store: StoreArgs,
}

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct StoreArgs {
    /// Override the configured SQLite database file
    #[arg(long)]
    pub(crate) database: Option<std::path::PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Requests {
            command: RequestsCommand::Export(args),
        } => run_export(args),
        Command::Requests {
            command: RequestsCommand::SetStatus(args),
        } => run_set_status(args),
        Command::Dashboard(args) => run_dashboard(args),
    }
}
