use crate::commands::{run_batch, run_decide, run_stats, BatchArgs, DecideArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_desk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Loan Desk",
    about = "Score loan applicants, explain rejections, and track verdict counts",
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
    /// Decide a single applicant given as name=value fields
    Decide(DecideArgs),
    /// Decide every applicant in a CSV file
    Batch(BatchArgs),
    /// Print the current approval and rejection counters
    Stats,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Decide(args) => run_decide(args),
        Command::Batch(args) => run_batch(args),
        Command::Stats => run_stats(),
    }
}
