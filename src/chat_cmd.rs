//! The `rfy chat` and `rfy ask` commands.

use anyhow::{bail, Result};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::ApiClient;
use crate::chat::{ChatController, ChatOptions, SessionStatus, Submission};
use crate::config::Config;
use crate::models::{SETTING_COLLECTION, SETTING_MODEL};
use crate::render::StdoutTokens;

/// Model used when neither flags, config, nor backend settings name one.
pub const DEFAULT_MODEL: &str = "llama3:latest";

/// Resolve model and collection: explicit flag, then config file, then the
/// backend's own settings, then built-ins. The backend lookup is
/// best-effort — an unreachable settings endpoint must not block chatting.
pub async fn resolve_chat_options(
    api: &ApiClient,
    config: &Config,
    model_flag: Option<String>,
    collection_flag: Option<String>,
) -> ChatOptions {
    let mut model = model_flag.or_else(|| config.chat.model.clone());
    let mut collection = collection_flag.or_else(|| config.chat.collection.clone());

    if model.is_none() || collection.is_none() {
        match api.fetch_settings().await {
            Ok(settings) => {
                if model.is_none() {
                    model = settings.get(SETTING_MODEL).cloned().flatten();
                }
                if collection.is_none() {
                    collection = settings.get(SETTING_COLLECTION).cloned().flatten();
                }
            }
            Err(err) => {
                tracing::debug!(%err, "backend settings unavailable; using built-in chat defaults");
            }
        }
    }

    ChatOptions {
        model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        collection,
        stream_timeout: config.chat.stream_timeout(),
    }
}

/// One prompt, streamed answer on stdout. Fails the process when the
/// session does not complete.
pub async fn run_ask(
    config: &Config,
    prompt: &str,
    model: Option<String>,
    collection: Option<String>,
) -> Result<()> {
    let api = ApiClient::new(&config.api.base_url, config.api.request_timeout())?;
    let options = resolve_chat_options(&api, config, model, collection).await;
    let mut controller = ChatController::new(api, options, Arc::new(StdoutTokens::new()));

    match controller.submit(prompt) {
        Submission::Started => {}
        Submission::EmptyPrompt => bail!("Prompt must not be empty."),
        Submission::Busy => unreachable!("no session was active"),
    }

    let Some(report) = controller
        .wait_or_cancel(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    else {
        unreachable!("a session was just started");
    };

    match report.status {
        SessionStatus::Completed | SessionStatus::Aborted => Ok(()),
        _ => match report.error.as_ref().and_then(|e| e.user_message()) {
            Some(message) => bail!("{message}"),
            None => bail!("Chat session did not complete."),
        },
    }
}

/// Interactive chat loop. Each submitted line drives one streaming session;
/// Ctrl-C cancels an in-flight answer without leaving the loop, Ctrl-D (or
/// `/quit`) ends it.
pub async fn run_chat(
    config: &Config,
    model: Option<String>,
    collection: Option<String>,
) -> Result<()> {
    let api = ApiClient::new(&config.api.base_url, config.api.request_timeout())?;
    let options = resolve_chat_options(&api, config, model, collection).await;
    let interactive = atty::is(atty::Stream::Stdin);

    if interactive {
        println!(
            "Chatting with {} — Ctrl-D ends the session, Ctrl-C cancels an answer.",
            options.model
        );
    }

    let mut controller = ChatController::new(api, options, Arc::new(StdoutTokens::new()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if interactive {
            print!("you> ");
            let _ = std::io::stdout().flush();
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt == "/quit" || prompt == "/exit" {
            break;
        }

        match controller.submit(prompt) {
            Submission::Started => {}
            // One line drives one session; nothing to do for a rejection.
            Submission::Busy | Submission::EmptyPrompt => continue,
        }

        let Some(report) = controller
            .wait_or_cancel(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
        else {
            continue;
        };

        if let Some(message) = report.error.as_ref().and_then(|e| e.user_message()) {
            eprintln!("{message}");
        }
    }

    Ok(())
}
