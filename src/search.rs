//! The `rfy search` command: vector search over indexed payloads.

use anyhow::Result;
use serde_json::Value;

use crate::api::ApiClient;
use crate::config::Config;
use crate::models::SearchRequest;

pub async fn run_search(
    config: &Config,
    query: &str,
    collection: Option<String>,
    limit: Option<u32>,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let api = ApiClient::new(&config.api.base_url, config.api.request_timeout())?;
    let response = api
        .search_payloads(&SearchRequest {
            query: query.to_string(),
            collection_name: collection.or_else(|| config.chat.collection.clone()),
            limit,
        })
        .await?;

    if response.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in response.results.iter().enumerate() {
        let title = hit
            .payload
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("(untitled)");
        println!("{}. [{:.2}] {}", i + 1, hit.score, title);
        if let Some(description) = hit.payload.get("description").and_then(Value::as_str) {
            println!("    description: {}", description.replace('\n', " "));
        }
        if let Some(url) = hit.payload.get("url").and_then(Value::as_str) {
            println!("    url: {}", url);
        }
        if let Some(collection) = hit.payload.get("collection_name").and_then(Value::as_str) {
            println!("    collection: {}", collection);
        }
        println!("    id: {}", hit.id);
        println!();
    }
    Ok(())
}
