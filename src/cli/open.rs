//! `sessionbridge open` - open an origin in the default browser

use anyhow::{bail, Context};
use clap::Args;
use url::Url;

use super::Components;

#[derive(Args)]
pub struct OpenArgs {
    /// What to open: "localhost" (default) or an endpoint name fragment,
    /// e.g. "school test"
    pub target: Option<String>,
}

pub async fn run(args: OpenArgs, components: &Components) -> anyhow::Result<()> {
    let target = args.target.unwrap_or_else(|| "localhost".to_string());

    let url = if target.eq_ignore_ascii_case("localhost") {
        components.config.target_origin.clone()
    } else {
        endpoint_origin(&target, components)?
    };

    tracing::info!(%url, "opening in browser");
    open::that(&url).with_context(|| format!("failed to open {url}"))?;
    println!("Opened {url}");
    Ok(())
}

/// Resolve an endpoint name fragment to that endpoint's origin.
fn endpoint_origin(fragment: &str, components: &Components) -> anyhow::Result<String> {
    let needle = fragment.to_lowercase();
    let endpoint = components
        .config
        .endpoints
        .iter()
        .find(|endpoint| endpoint.name.to_lowercase().contains(&needle));

    let Some(endpoint) = endpoint else {
        let names: Vec<&str> = components
            .config
            .endpoints
            .iter()
            .map(|endpoint| endpoint.name.as_str())
            .collect();
        bail!("no endpoint matches '{fragment}' (known: {})", names.join(", "));
    };

    let mut url = Url::parse(&endpoint.url)
        .with_context(|| format!("invalid endpoint url {}", endpoint.url))?;
    url.set_path("");
    url.set_query(None);
    Ok(url.to_string())
}
