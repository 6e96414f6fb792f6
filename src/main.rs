use colored::*;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    testree::init();
    testree::infra::logging::init();

    match testree::cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
