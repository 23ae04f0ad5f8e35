use clap::Parser;
use sensornet_runner::{init_tracing, run, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.log_level.as_deref()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "sensornet failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
