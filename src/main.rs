mod auth;
mod cli;
mod config;
mod error;
mod models;
mod pipeline;
mod providers;
mod report;

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting CommitLens - commit quality insights");

    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            // Any failure, malformed input or pipeline, is one JSON error object and a non-zero exit.
            println!("{}", cli::error_document(&e));
            ExitCode::FAILURE
        }
    }
}
