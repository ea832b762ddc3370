//! `sessionbridge status` - check all configured endpoints

use chrono::{Local, Utc};
use clap::Args;

use super::Components;
use crate::core::{ProbeResult, SessionStatus};

#[derive(Args)]
pub struct StatusArgs {
    /// Bypass the cache and probe the endpoints live
    #[arg(long)]
    pub refresh: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: StatusArgs, components: &Components) -> anyhow::Result<()> {
    let results = if args.refresh {
        components.aggregator.refresh().await
    } else {
        components.aggregator.check_all_with_cache().await
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    print_table(&results);
    Ok(())
}

fn print_table(results: &[ProbeResult]) {
    let name_width = results
        .iter()
        .map(|result| result.endpoint.len())
        .max()
        .unwrap_or(0);

    for result in results {
        println!(
            "{:<name_width$}  {:<12} {}",
            result.endpoint,
            format!("{} {}", glyph(result.status), result.status),
            describe(result),
        );
    }

    if let Some(newest) = results.iter().map(|result| result.last_checked).max() {
        let age = Utc::now() - newest;
        let stamp = newest.with_timezone(&Local).format("%H:%M:%S");
        if age > chrono::Duration::seconds(5) {
            println!("\nLast checked {stamp} (cached)");
        } else {
            println!("\nLast checked {stamp}");
        }
    }
}

fn glyph(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Active => "●",
        SessionStatus::Expired => "◐",
        SessionStatus::Unavailable => "○",
    }
}

fn describe(result: &ProbeResult) -> String {
    let mut parts = vec![format!("{}ms", result.response_time_ms)];
    if let Some(retries) = result.retry_count {
        parts.push(format!("after {retries} retries"));
    }
    if let Some(error) = &result.error {
        parts.push(error.clone());
    }
    parts.join(", ")
}
