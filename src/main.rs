use colored::Colorize;
use std::process::ExitCode;

/// EX_TEMPFAIL: the state record was busy; the same invocation may be retried.
const EXIT_RETRYABLE: u8 = 75;

fn main() -> ExitCode {
    match trustgov::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".bright_red().bold(), e);
            if e.is_retryable() {
                ExitCode::from(EXIT_RETRYABLE)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
