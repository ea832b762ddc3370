//! `sessionbridge check` - probe a single endpoint URL

use anyhow::bail;
use clap::Args;

use super::Components;
use crate::core::{parse_status, ProbeResponse};
use crate::service::{Request, Response};

#[derive(Args)]
pub struct CheckArgs {
    /// Endpoint URL to probe
    pub url: String,

    /// Print the raw response as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: CheckArgs, components: &Components) -> anyhow::Result<()> {
    let response = components
        .service
        .handle(Request::CheckSessionStatus { url: args.url })
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    match response {
        Response::Check {
            success,
            status,
            response_time,
            error,
        } => {
            let classified = parse_status(&ProbeResponse {
                success,
                http_status: status,
                response_time_ms: response_time,
                error: error.clone(),
            });
            match error {
                Some(error) => println!("HTTP {status} ({response_time}ms) - {classified}: {error}"),
                None => println!("HTTP {status} ({response_time}ms) - {classified}"),
            }
            Ok(())
        }
        other => bail!("unexpected response: {other:?}"),
    }
}
