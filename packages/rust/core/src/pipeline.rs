//! End-to-end `extract` pipeline: dataset → flatten → align → build → write.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument};

use edumeta_artifacts::ArtifactMeta;
use edumeta_shared::{
    FieldNames, Interactions, ItemRecord, KnowledgeIndex, KnowledgePolicy, LearningOrder, Result,
};

use crate::items::build_items;
use crate::know_item::build_know_item;
use crate::learning_order::build_learning_order;

/// Configuration for the `extract_meta` pipeline.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Source dataset (`.npz` or `.json`).
    pub source: PathBuf,
    /// Directory receiving the three JSON documents.
    pub output_dir: PathBuf,
    /// Names of the fields read from the source.
    pub fields: FieldNames,
    /// Resolution of conflicting question → knowledge observations.
    pub knowledge_policy: KnowledgePolicy,
}

/// The three derived structures, built in memory before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaData {
    pub learning_order: LearningOrder,
    pub items: Vec<ItemRecord>,
    pub know_item: KnowledgeIndex,
}

/// Result of the `extract_meta` pipeline.
#[derive(Debug)]
pub struct ExtractResult {
    /// Directory the documents were written to.
    pub output_dir: PathBuf,
    /// Valid (mask-selected) timesteps aggregated.
    pub interaction_count: usize,
    /// Distinct items in `items.json`.
    pub item_count: usize,
    /// Distinct knowledge ids in `learning_order.json`.
    pub knowledge_count: usize,
    /// Written documents with checksums.
    pub artifacts: Vec<ArtifactMeta>,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &ExtractResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &ExtractResult) {}
}

/// Run the three builders over aligned interactions.
pub fn build_meta(interactions: &Interactions, policy: KnowledgePolicy) -> Result<MetaData> {
    let learning_order = build_learning_order(&interactions.knowledge_ids);
    let items = build_items(interactions, policy)?;
    let know_item = build_know_item(&items);

    Ok(MetaData {
        learning_order,
        items,
        know_item,
    })
}

/// Run the full `extract` pipeline.
///
/// 1. Load the named fields from the source
/// 2. Flatten dense/ragged storage
/// 3. Check alignment and apply the mask
/// 4. Build learning order, items, and knowledge index
/// 5. Write the three documents
#[instrument(skip_all, fields(source = %config.source.display(), output_dir = %config.output_dir.display()))]
pub fn extract_meta(config: &ExtractConfig, progress: &dyn ProgressReporter) -> Result<ExtractResult> {
    let start = Instant::now();

    info!(policy = %config.knowledge_policy, "starting extract pipeline");

    // --- Phase 1: Load ---
    progress.phase("Loading dataset");
    let batch = edumeta_dataset::load_dataset(&config.source, &config.fields)?;

    // --- Phase 2: Flatten + align ---
    progress.phase("Aligning fields");
    let interactions = edumeta_dataset::align(&batch.flatten()?)?;
    drop(batch);

    // --- Phase 3: Build ---
    progress.phase("Building meta-data");
    let meta = build_meta(&interactions, config.knowledge_policy)?;

    // --- Phase 4: Write ---
    progress.phase("Writing documents");
    let artifacts = edumeta_artifacts::write_meta(
        &config.output_dir,
        &meta.learning_order,
        &meta.items,
        &meta.know_item,
    )?;

    let result = ExtractResult {
        output_dir: config.output_dir.clone(),
        interaction_count: interactions.len(),
        item_count: meta.items.len(),
        knowledge_count: meta.learning_order.len(),
        artifacts,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        interactions = result.interaction_count,
        items = result.item_count,
        knowledge = result.knowledge_count,
        elapsed_ms = result.elapsed.as_millis(),
        "extract pipeline complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
