//! The `rfy settings` commands: read and edit backend runtime configuration.

use anyhow::{bail, Result};

use crate::api::ApiClient;
use crate::config::Config;
use crate::models::SettingsMap;

pub async fn run_show(config: &Config) -> Result<()> {
    let api = ApiClient::new(&config.api.base_url, config.api.request_timeout())?;
    let settings = api.fetch_settings().await?;

    if settings.is_empty() {
        println!("No settings.");
        return Ok(());
    }

    // BTreeMap iteration keeps the listing stable across runs.
    println!("{:<32} VALUE", "KEY");
    for (key, value) in &settings {
        println!("{:<32} {}", key, value.as_deref().unwrap_or("(unset)"));
    }
    Ok(())
}

pub async fn run_set(config: &Config, pairs: Vec<(String, String)>) -> Result<()> {
    if pairs.is_empty() {
        bail!("No key=value pairs given.");
    }

    let api = ApiClient::new(&config.api.base_url, config.api.request_timeout())?;
    let settings: SettingsMap = pairs
        .into_iter()
        .map(|(key, value)| (key, Some(value)))
        .collect();

    let result = api.update_settings(settings).await?;
    println!("updated settings: {}", result.updated.join(", "));
    Ok(())
}
