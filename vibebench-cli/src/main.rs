use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod dashboard;
mod logging;
mod precheck;
mod report;

#[derive(Parser)]
#[command(name = "vibebench", about = "Multi-tool coding benchmark")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Distribute a prompt, watch the targets and score the results
    Run(commands::run::RunArgs),
    /// Show the current per-target status and the latest report
    Status(commands::status::StatusArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::run(args, cli.verbose).await,
        Commands::Status(args) => commands::status::run(args, cli.verbose),
    }
}
