//! # Ragtify client CLI (`rfy`)
//!
//! The `rfy` binary is the terminal interface to a Ragtify RAG backend:
//! streaming chat grounded in the backend's vector index, payload
//! management, and runtime settings editing.
//!
//! ## Usage
//!
//! ```bash
//! rfy --config ./config/rfy.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rfy chat` | Interactive streaming chat session |
//! | `rfy ask "<prompt>"` | One prompt, streamed answer on stdout |
//! | `rfy payloads list` | List payload records |
//! | `rfy payloads add <title>` | Create a payload |
//! | `rfy payloads remove <id>` | Delete a payload (and its vector entry) |
//! | `rfy payloads process` | Sync buffered payloads into the vector store |
//! | `rfy search "<query>"` | Vector search over indexed payloads |
//! | `rfy settings show` | Print backend runtime settings |
//! | `rfy settings set k=v` | Update backend runtime settings |
//!
//! ## Examples
//!
//! ```bash
//! # One-shot question against the default collection
//! rfy ask "How do I roll back a deployment?"
//!
//! # Chat with an explicit model and collection
//! rfy chat --model llama3:latest --collection runbooks
//!
//! # Index a document and make it searchable
//! rfy payloads add "Rollback runbook" --url https://wiki/rollbacks
//! rfy payloads process
//!
//! # Point the backend at a different Ollama instance
//! rfy settings set ollama_url=http://ollama:11434
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ragtify_client::{chat_cmd, config, payloads, search, settings_cmd};

const DEFAULT_CONFIG_PATH: &str = "./config/rfy.toml";

/// Ragtify client CLI — chat with your indexed content, manage payloads,
/// and edit backend settings.
#[derive(Parser)]
#[command(
    name = "rfy",
    about = "Ragtify client — streaming RAG chat and payload management from the terminal",
    version,
    long_about = "The rfy binary talks to a Ragtify RAG backend over HTTP: it streams chat \
    answers grounded in the backend's vector index, manages the payloads injected into that \
    index, and reads or edits the backend's runtime settings."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When omitted, `./config/rfy.toml` is used if it exists and built-in
    /// defaults otherwise. See `config/rfy.example.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session.
    ///
    /// Each submitted line streams one answer. Ctrl-C cancels an in-flight
    /// answer without leaving the session; Ctrl-D (or `/quit`) ends it.
    Chat {
        /// Model to chat with. Defaults to the config file, then the
        /// backend's `llama_model` setting.
        #[arg(long)]
        model: Option<String>,

        /// Collection queried for grounding context. Defaults to the config
        /// file, then the backend's `default_collection_name` setting.
        #[arg(long)]
        collection: Option<String>,
    },

    /// Ask a single question and stream the answer to stdout.
    ///
    /// Exits non-zero when the session errors or times out.
    Ask {
        /// The prompt to send.
        prompt: String,

        /// Model to chat with (see `chat --model`).
        #[arg(long)]
        model: Option<String>,

        /// Collection queried for grounding context (see `chat --collection`).
        #[arg(long)]
        collection: Option<String>,
    },

    /// Manage the payloads indexed into the vector store.
    Payloads {
        #[command(subcommand)]
        action: PayloadsAction,
    },

    /// Vector search over indexed payloads.
    Search {
        /// The search query string.
        query: String,

        /// Restrict the search to one collection.
        #[arg(long)]
        collection: Option<String>,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Read or edit backend runtime settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

/// Payload management subcommands.
#[derive(Subcommand)]
enum PayloadsAction {
    /// List payload records.
    List {
        /// Only show payloads from this collection.
        #[arg(long)]
        collection: Option<String>,
    },

    /// Create a payload in the backend's buffer.
    ///
    /// New payloads are not searchable until `payloads process` syncs them
    /// into the vector store.
    Add {
        /// Payload title.
        title: String,

        /// Payload description.
        #[arg(long)]
        description: Option<String>,

        /// Payload URL.
        #[arg(long)]
        url: Option<String>,

        /// External identifier of the source document.
        #[arg(long)]
        source_id: Option<String>,

        /// Collection to file the payload under. Defaults to the config
        /// file, then the backend's `default_collection_name` setting.
        #[arg(long)]
        collection: Option<String>,
    },

    /// Delete a payload and its vector store entry.
    Remove {
        /// Payload id.
        id: i64,
    },

    /// Sync buffered payloads into the vector store.
    Process {
        /// Only process payloads from this collection.
        #[arg(long)]
        collection: Option<String>,
    },
}

/// Settings subcommands.
#[derive(Subcommand)]
enum SettingsAction {
    /// Print all backend settings.
    Show,

    /// Update backend settings from `key=value` pairs.
    Set {
        /// One or more `key=value` pairs, e.g. `llama_model=llama3:latest`.
        #[arg(required = true, value_parser = parse_key_val)]
        pairs: Vec<(String, String)>,
    },
}

/// Parse a `key=value` pair for `settings set` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Load config per the `--config` rules: an explicit path must load, the
/// default path is optional.
fn load_config(cli_path: &Option<PathBuf>) -> Result<config::Config> {
    match cli_path {
        Some(path) => config::load_config(path),
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                config::load_config(&default_path)
            } else {
                Ok(config::Config::minimal())
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr so stdout stays parseable for scripts.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ragtify_client=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.command {
        Commands::Chat { model, collection } => {
            chat_cmd::run_chat(&cfg, model, collection).await?;
        }
        Commands::Ask {
            prompt,
            model,
            collection,
        } => {
            chat_cmd::run_ask(&cfg, &prompt, model, collection).await?;
        }
        Commands::Payloads { action } => match action {
            PayloadsAction::List { collection } => {
                payloads::run_list(&cfg, collection).await?;
            }
            PayloadsAction::Add {
                title,
                description,
                url,
                source_id,
                collection,
            } => {
                payloads::run_add(&cfg, title, description, url, source_id, collection).await?;
            }
            PayloadsAction::Remove { id } => {
                payloads::run_remove(&cfg, id).await?;
            }
            PayloadsAction::Process { collection } => {
                payloads::run_process(&cfg, collection).await?;
            }
        },
        Commands::Search {
            query,
            collection,
            limit,
        } => {
            search::run_search(&cfg, &query, collection, limit).await?;
        }
        Commands::Settings { action } => match action {
            SettingsAction::Show => {
                settings_cmd::run_show(&cfg).await?;
            }
            SettingsAction::Set { pairs } => {
                settings_cmd::run_set(&cfg, pairs).await?;
            }
        },
    }

    Ok(())
}
