//! Shared types, error model, and configuration for edumeta.
//!
//! This crate is the foundation depended on by all other edumeta crates.
//! It provides:
//! - [`EduMetaError`] — the unified error type
//! - Domain types ([`Interactions`], [`ItemRecord`], [`KnowledgeIndex`], [`LearningOrder`])
//! - Configuration ([`AppConfig`], [`FieldNames`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExtractDefaults, FieldNames, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{EduMetaError, Result};
pub use types::{
    ITEMS_FILE, Interactions, ItemRecord, KNOW_ITEM_FILE, KnowledgeIndex, KnowledgePolicy,
    LEARNING_ORDER_FILE, LearningOrder, NEUTRAL_DIFFICULTY,
};
