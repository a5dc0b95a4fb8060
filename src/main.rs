//! Binary entrypoint for the `strata` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // API keys may live in a local .env file.
    dotenvy::dotenv().ok();

    match strata::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
