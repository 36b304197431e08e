//! Interaction dataset loading, flattening, and mask alignment.
//!
//! This crate provides:
//! - [`DatasetSource`] — `.npz` and JSON readers for named fields
//! - [`RawField`] — dense or ragged field storage and its flattener
//! - [`align`] — length checks and mask filtering into [`Interactions`]
//!
//! [`Interactions`]: edumeta_shared::Interactions

pub mod align;
pub mod field;
mod npy;
pub mod source;

use std::path::Path;

use tracing::{info, instrument, warn};

use edumeta_shared::{EduMetaError, FieldNames, Result};

pub use align::{FlatBatch, FlatField, RawInteractionBatch, align};
pub use field::{FieldLayout, LayoutSummary, RawField, Scalar};
pub use source::{DatasetSource, JsonSource, NpzSource, open_source};

/// Read the interaction fields named in `names` from a source.
///
/// `question_id` and knowledge fields are required; correctness and mask
/// are optional.
pub fn load_batch(source: &mut dyn DatasetSource, names: &FieldNames) -> Result<RawInteractionBatch> {
    let question_id = source
        .read_field(&names.question_id)?
        .ok_or_else(|| EduMetaError::MissingField(names.question_id.clone()))?;
    let knowledge = source
        .read_field(&names.knowledge)?
        .ok_or_else(|| EduMetaError::MissingField(names.knowledge.clone()))?;
    let correctness = source.read_field(&names.correctness)?;
    let mask = source.read_field(&names.mask)?;

    Ok(RawInteractionBatch {
        question_id,
        knowledge,
        correctness,
        mask,
    })
}

/// Open `path`, load the interaction fields, and return the raw batch.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_dataset(path: &Path, names: &FieldNames) -> Result<RawInteractionBatch> {
    let mut source = open_source(path)?;
    let batch = load_batch(source.as_mut(), names)?;

    info!(
        format = source.format(),
        question_id = %batch.question_id.summary(),
        knowledge = %batch.knowledge.summary(),
        labelled = batch.correctness.is_some(),
        masked = batch.mask.is_some(),
        "dataset loaded"
    );

    Ok(batch)
}

/// Per-field description produced by [`inspect`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldReport {
    pub name: String,
    /// Layout statistics, or the reason the field could not be decoded.
    pub stats: std::result::Result<FieldStats, String>,
}

/// Layout statistics of one decodable field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldStats {
    pub layout: LayoutSummary,
    /// Number of elements after flattening.
    pub flat_len: usize,
    /// Whether every element is integral (ids, masks, 0/1 labels).
    pub integral: bool,
}

/// Describe every field in a dataset without aggregating it.
///
/// A field that fails to decode is reported with its error; the other
/// fields are still described.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn inspect(path: &Path) -> Result<Vec<FieldReport>> {
    let mut source = open_source(path)?;
    let mut reports = Vec::new();

    for name in source.field_names() {
        let stats = match field_stats(source.as_mut(), &name) {
            Ok(Some(stats)) => Ok(stats),
            Ok(None) => continue,
            Err(e) => {
                warn!(field = %name, error = %e, "field could not be decoded");
                Err(e.to_string())
            }
        };
        reports.push(FieldReport { name, stats });
    }

    Ok(reports)
}

fn field_stats(source: &mut dyn DatasetSource, name: &str) -> Result<Option<FieldStats>> {
    let Some(field) = source.read_field(name)? else {
        return Ok(None);
    };
    let flat = field.flatten()?;
    Ok(Some(FieldStats {
        layout: field.summary(),
        flat_len: flat.len(),
        integral: flat.iter().all(|v| v.to_id().is_some()),
    }))
}
