//! Zero - terminal front end for the mail core
//!
//! Every command resolves the session, opens the connection store and runs
//! one mail action or list fetch through the same layers a graphical client
//! would use.

use clap::Parser;
use log::error;
use std::process::ExitCode;

mod cli;
mod commands;
mod demo;
mod render;

use cli::Cli;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let cli = Cli::parse();
    match commands::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
