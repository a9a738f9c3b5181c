use crate::roster::{run_roster_check, RosterCheckArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use works_council::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Works Council Admin",
    about = "Serve and inspect works-council membership data for social elections",
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
    /// Inspect employee roster exports before seeding the directory
    Roster {
        #[command(subcommand)]
        command: RosterCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RosterCommand {
    /// Parse a roster CSV and print headcount per unit
    Check(RosterCheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed the employee directory from this roster CSV
    #[arg(long)]
    pub(crate) roster: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Roster {
            command: RosterCommand::Check(args),
        } => run_roster_check(args),
    }
}
