use clap::Args;
use std::path::PathBuf;
use works_council::council::EmployeeRoster;
use works_council::error::AppError;

#[derive(Args, Debug)]
pub(crate) struct RosterCheckArgs {
    /// Roster CSV with Employee ID, Unit ID, First Name, Last Name and Email columns
    pub(crate) path: PathBuf,
}

pub(crate) fn run_roster_check(args: RosterCheckArgs) -> Result<(), AppError> {
    let roster = EmployeeRoster::from_path(&args.path)?;
    let summary = roster.summary();
    let rendered = serde_json::to_string_pretty(&summary)
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
    println!("{rendered}");
    Ok(())
}
