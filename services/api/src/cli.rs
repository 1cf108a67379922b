use crate::demo::{run_demo, run_merit_export, run_tuition, DemoArgs, MeritArgs, TuitionArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uap_admission::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "UAP Admission Portal",
    about = "Run and demonstrate the UAP admission portal from the command line",
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
    /// Walk one applicant cohort through submission, payment, and acceptance in memory
    Demo(DemoArgs),
    /// Rank the applications stored in a data directory and write the merit list as CSV
    Merit(MeritArgs),
    /// Estimate tuition for a degree
    Tuition(TuitionArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Persist collections under this directory instead of UAP_DATA_DIR
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Keep everything in memory even when a data directory is configured
    #[arg(long, conflicts_with = "data_dir")]
    pub(crate) in_memory: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Merit(args) => run_merit_export(args),
        Command::Tuition(args) => run_tuition(args),
    }
}
