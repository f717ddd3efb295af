//! cuesheet - production scheduling for live events

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = cuesheet::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
