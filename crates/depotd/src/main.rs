//! `depotd` binary entry point.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match depotd::run_service() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let mut stderr = io::stderr().lock();
            let _ignored = writeln!(stderr, "depotd: {error}");
            ExitCode::FAILURE
        }
    }
}
