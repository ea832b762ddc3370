//! Command-line interface

pub mod check;
pub mod copy;
pub mod open;
pub mod status;

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{self, BridgeConfig};
use crate::service::Service;
use crate::session::{CookieTransfer, HttpProber, Prober, StatusAggregator, TokenResolver};
use crate::store::{FileCookieStore, FileKvStore, KvStore};
use crate::core::CookieStore;

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const UNEXPECTED_FAILURE: i32 = 1;
}

#[derive(Parser)]
#[command(
    name = "sessionbridge",
    version,
    about = "Mirror mos.ru auth cookies onto localhost and monitor session health"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check session status of all configured endpoints
    Status(status::StatusArgs),
    /// Copy auth cookies from a remote origin onto the local target origin
    Copy(copy::CopyArgs),
    /// Probe a single endpoint URL
    Check(check::CheckArgs),
    /// Open the target origin or an endpoint in the default browser
    Open(open::OpenArgs),
}

/// The explicitly wired component graph the subcommands run against.
///
/// Everything is constructed once here and handed to the command layer;
/// there are no ambient singletons.
pub struct Components {
    pub config: Arc<BridgeConfig>,
    pub aggregator: StatusAggregator,
    pub service: Service,
}

/// Build the component graph over the file-backed stores.
pub fn init(config: BridgeConfig) -> Components {
    let config = Arc::new(config);
    let data_dir = config::data_dir();

    let cookie_store: Arc<dyn CookieStore> =
        Arc::new(FileCookieStore::new(data_dir.join("cookies.json")));
    let cache: Arc<dyn KvStore> = Arc::new(FileKvStore::new(data_dir));

    let resolver = TokenResolver::new(cookie_store.clone(), config.clone());
    let prober: Arc<dyn Prober> = Arc::new(HttpProber::new(
        resolver,
        Duration::from_secs(config.probe_timeout_secs),
    ));

    let aggregator = StatusAggregator::new(prober.clone(), cache, &config);
    let transfer = CookieTransfer::new(cookie_store, config.clone());
    let service = Service::new(transfer, prober);

    Components {
        config,
        aggregator,
        service,
    }
}
