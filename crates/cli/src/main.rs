use std::process::ExitCode;

use clap::Parser;

mod commands;

fn main() -> ExitCode {
    accessgate_observability::init();

    let cli = commands::Cli::parse();
    match commands::run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "accessgate failed");
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
