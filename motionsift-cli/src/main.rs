// motionsift-cli/src/main.rs
//
// Entry point for the `motionsift` binary: parses arguments, installs the
// logger, dispatches to the selected command and maps the outcome to the
// process exit code.

use anyhow::{Context, bail};
use clap::Parser;
use log::debug;

use motionsift_cli::commands::extract::failure_message;
use motionsift_cli::{Cli, Commands, logging, run_extract, run_inspect};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = logging::init(cli.verbose, cli.log_dir.as_deref())
        .context("Failed to set up logging")?;
    debug!("Run started: {}", chrono::Local::now());

    match cli.command {
        Commands::Extract(args) => {
            let summary = run_extract(args, log_file.as_deref())?;
            if let Some(message) = failure_message(&summary) {
                bail!(message);
            }
        }
        Commands::Inspect(args) => {
            let summary = run_inspect(args)?;
            if summary.failed > 0 {
                bail!("No embedded video found in {} file(s)", summary.failed);
            }
        }
    }

    debug!("Finished at: {}", chrono::Local::now());
    Ok(())
}
