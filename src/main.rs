//! sessionbridge - mirror mos.ru auth cookies onto localhost and monitor
//! session health
//!
//! Two independent flows share one component graph:
//! - `copy` mirrors auth cookies from a remote environment onto the local
//!   dev origin;
//! - `status`/`check` probe the configured endpoints with a bearer token
//!   and classify each session as active, expired or unavailable.

mod cli;
mod config;
mod core;
mod logging;
mod service;
mod session;
mod store;

use clap::Parser;
use cli::{exit_codes, Cli, Commands};

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(err) = logging::init(cli.verbose, cli.json_logs) {
        eprintln!("Failed to initialize logging: {err}");
        return exit_codes::UNEXPECTED_FAILURE;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("Failed to create runtime: {err}");
            return exit_codes::UNEXPECTED_FAILURE;
        }
    };

    let components = cli::init(config::BridgeConfig::load());

    let result = rt.block_on(async {
        match cli.command {
            Commands::Status(args) => cli::status::run(args, &components).await,
            Commands::Copy(args) => cli::copy::run(args, &components).await,
            Commands::Check(args) => cli::check::run(args, &components).await,
            Commands::Open(args) => cli::open::run(args, &components).await,
        }
    });

    match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            exit_codes::UNEXPECTED_FAILURE
        }
    }
}
