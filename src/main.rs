use std::process::ExitCode;

use clap::Parser;
use lapsed::cli::{run_cli, Args, EXIT_FAILURE};

fn main() -> ExitCode {
    let args = Args::parse();

    match run_cli(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Error running cli {e:?}");
            eprintln!("Error: {e:?}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
