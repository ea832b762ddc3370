//! `sessionbridge copy` - mirror cookies onto the target origin

use anyhow::bail;
use clap::{Args, ValueEnum};

use super::Components;
use crate::service::{Request, Response};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EnvName {
    Dev,
    Test,
}

#[derive(Args)]
pub struct CopyArgs {
    /// Named source environment
    #[arg(long, value_enum, conflicts_with = "domain")]
    pub env: Option<EnvName>,

    /// Explicit source origin, e.g. https://uchebnik-test.mos.ru
    #[arg(long)]
    pub domain: Option<String>,

    /// Copy only the auth token and profile cookies
    #[arg(long)]
    pub minimal: bool,
}

pub async fn run(args: CopyArgs, components: &Components) -> anyhow::Result<()> {
    let domain = if let Some(env) = args.env {
        match env {
            EnvName::Dev => "https://uchebnik-dev.mos.ru".to_string(),
            EnvName::Test => "https://uchebnik-test.mos.ru".to_string(),
        }
    } else if let Some(domain) = args.domain {
        domain
    } else {
        bail!("specify a source with --env dev|test or --domain <origin>");
    };

    let response = components
        .service
        .handle(Request::CopyAndPaste {
            domain,
            minimal: args.minimal,
        })
        .await;

    match response {
        Response::Copy { message } => {
            println!("{message}");
            Ok(())
        }
        other => bail!("unexpected response: {other:?}"),
    }
}
