//! Aggregation builders and pipeline orchestration for edumeta.
//!
//! This crate turns aligned interactions into the three meta-data
//! documents and ties loading, building, and writing into `extract_meta`.

pub mod items;
pub mod know_item;
pub mod learning_order;
pub mod pipeline;

pub use items::build_items;
pub use know_item::build_know_item;
pub use learning_order::build_learning_order;
pub use pipeline::{
    ExtractConfig, ExtractResult, MetaData, ProgressReporter, SilentProgress, build_meta,
    extract_meta,
};
