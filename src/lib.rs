//! # Ragtify Client
//!
//! Terminal client for the Ragtify RAG backend. It lets a user converse with
//! a model whose answers are grounded in the backend's vector index, manage
//! the payloads injected into that index, and edit the backend's runtime
//! configuration.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌──────────────────┐
//! │   CLI    │──▶│ ChatController │──▶│  Ragtify API      │
//! │  (rfy)   │   │  one session   │   │ /content /settings│
//! └──────────┘   └──────┬─────────┘   └────────┬─────────┘
//!                       │ records              │ NDJSON body
//!                  ┌────▼─────┐          ┌─────▼───────┐
//!                  │Transcript│◀─────────│StreamDecoder│
//!                  └──────────┘   tokens └─────────────┘
//! ```
//!
//! The chat path is the heart of the crate: a submission opens one streaming
//! HTTP request, the decoder turns its arbitrarily chunked NDJSON body into
//! complete records, and the transcript applies them in arrival order while
//! a deadline and a cancel channel bound the whole exchange.
//!
//! ## Quick Start
//!
//! ```bash
//! rfy ask "What does the deployment runbook say about rollbacks?"
//! rfy chat                      # interactive session
//! rfy payloads add "Runbook" --url https://wiki/runbook
//! rfy payloads process          # sync payloads into the vector store
//! rfy search "rollbacks"
//! rfy settings show
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Wire types for the backend API |
//! | [`api`] | Typed HTTP client |
//! | [`decode`] | Incremental NDJSON decoding |
//! | [`transcript`] | Conversation history and its mutations |
//! | [`chat`] | Streaming session state machine |
//! | [`render`] | Incremental token rendering |
//! | [`error`] | Chat failure classification |
//! | [`chat_cmd`] | `chat` / `ask` commands |
//! | [`payloads`] | `payloads` commands |
//! | [`search`] | `search` command |
//! | [`settings_cmd`] | `settings` commands |

pub mod api;
pub mod chat;
pub mod chat_cmd;
pub mod config;
pub mod decode;
pub mod error;
pub mod models;
pub mod payloads;
pub mod render;
pub mod search;
pub mod settings_cmd;
pub mod transcript;
