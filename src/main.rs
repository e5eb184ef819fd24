//! Main entry point for the vzip CLI app

use std::process::ExitCode;

fn main() -> ExitCode {
    match vzip::cli_runner::run_cli_app() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
