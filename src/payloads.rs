//! Payload management commands.
//!
//! Payloads live in the backend's buffer table until `process` syncs them
//! into the vector store; everything here is plumbing over the `/content/`
//! endpoints.

use anyhow::Result;

use crate::api::ApiClient;
use crate::config::Config;
use crate::models::{PayloadCreateRequest, PayloadFields, SETTING_COLLECTION};

fn client(config: &Config) -> Result<ApiClient> {
    ApiClient::new(&config.api.base_url, config.api.request_timeout())
}

/// Collection for a new payload: explicit flag, then config, then the
/// backend's default collection, then the backend's built-in fallback.
async fn resolve_collection(api: &ApiClient, config: &Config, flag: Option<String>) -> String {
    if let Some(collection) = flag.or_else(|| config.chat.collection.clone()) {
        return collection;
    }
    match api.fetch_settings().await {
        Ok(settings) => settings.get(SETTING_COLLECTION).cloned().flatten(),
        Err(err) => {
            tracing::debug!(%err, "backend settings unavailable; using default collection");
            None
        }
    }
    .unwrap_or_else(|| "content".to_string())
}

pub async fn run_list(config: &Config, collection: Option<String>) -> Result<()> {
    let api = client(config)?;
    let mut records = api.list_payloads().await?;
    if let Some(collection) = &collection {
        records.retain(|record| &record.collection_name == collection);
    }

    if records.is_empty() {
        println!("No payloads.");
        return Ok(());
    }

    println!("{:<8} {:<18} {:<22} TITLE", "ID", "COLLECTION", "SOURCE");
    for record in &records {
        println!(
            "{:<8} {:<18} {:<22} {}",
            record.id,
            record.collection_name,
            record.source_id.as_deref().unwrap_or("-"),
            record.payload.title.as_deref().unwrap_or("(untitled)")
        );
    }
    Ok(())
}

pub async fn run_add(
    config: &Config,
    title: String,
    description: Option<String>,
    url: Option<String>,
    source_id: Option<String>,
    collection: Option<String>,
) -> Result<()> {
    let api = client(config)?;
    let collection_name = resolve_collection(&api, config, collection).await;

    let request = PayloadCreateRequest {
        source_id,
        collection_name,
        payload: PayloadFields {
            title: Some(title),
            description,
            url,
            extra: Default::default(),
        },
    };
    let created = api.create_payload(&request).await?;
    println!(
        "created payload {} in collection {}",
        created.id,
        created.collection_name.as_deref().unwrap_or("-")
    );
    println!("Run `rfy payloads process` to sync it into the vector store.");
    Ok(())
}

pub async fn run_remove(config: &Config, id: i64) -> Result<()> {
    let api = client(config)?;
    let removed = api.delete_payload(id).await?;
    println!("removed payload {}", removed.id);
    Ok(())
}

pub async fn run_process(config: &Config, collection: Option<String>) -> Result<()> {
    let api = client(config)?;
    let result = api.process_payloads(collection.as_deref()).await?;

    if result.content_processed == 0 {
        println!("No pending payloads.");
        return Ok(());
    }
    println!("processed payloads: {}", result.content_processed);
    for collection in &result.collections {
        println!("  collection: {}", collection);
    }
    Ok(())
}
