//! Saldo Core Library
//!
//! Shared functionality for the Saldo statement dashboard:
//! - Per-page PDF text extraction
//! - Line-oriented statement parser with configurable month table
//! - Category labeling through a remote text model, with retry and throttle
//! - Full-replace persistence (local SQLite or a hosted PostgREST table)
//! - Dashboard aggregates and CSV export

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod extract;
pub mod labeler;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod reports;
pub mod statement;
pub mod store;

/// Test utilities including mock model API and PostgREST servers
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIClient, BackendKind, MockBackend, MockReply, TextGenerator};
pub use config::{ConfigSource, Overrides, Settings};
pub use db::Database;
pub use error::{Error, Result};
pub use labeler::{CategoryLabeler, LabelPolicy, RetryPolicy};
pub use models::*;
pub use pipeline::{NoProgress, ProcessReport, ProgressEvent, ProgressSink, StatementProcessor};
pub use prompts::{Prompt, PromptId};
pub use statement::{ParsedLine, ParserRules, ParserState};
pub use store::{fetch_for_display, RestStore, StoreClient, TransactionStore};
