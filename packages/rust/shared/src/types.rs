//! Core domain types for the extracted meta-data documents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EduMetaError;

/// File name of the knowledge traversal order document.
pub const LEARNING_ORDER_FILE: &str = "learning_order.json";

/// File name of the item catalog document.
pub const ITEMS_FILE: &str = "items.json";

/// File name of the knowledge-to-item index document.
pub const KNOW_ITEM_FILE: &str = "know_item.json";

/// Difficulty assigned to items without any observed correctness value.
pub const NEUTRAL_DIFFICULTY: f64 = 0.5;

// ---------------------------------------------------------------------------
// Interactions
// ---------------------------------------------------------------------------

/// Flattened, mask-filtered interaction columns.
///
/// Index `i` of every column refers to the same timestep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interactions {
    /// Item identifier per timestep.
    pub question_ids: Vec<i64>,
    /// Knowledge identifier per timestep.
    pub knowledge_ids: Vec<i64>,
    /// Correctness per timestep, when the dataset carries labels.
    pub correctness: Option<Vec<f64>>,
}

impl Interactions {
    /// Number of aligned timesteps.
    pub fn len(&self) -> usize {
        self.question_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.question_ids.is_empty()
    }

    /// Iterate `(question_id, knowledge_id, correctness)` triples.
    pub fn records(&self) -> impl Iterator<Item = (i64, i64, Option<f64>)> + '_ {
        self.question_ids
            .iter()
            .zip(&self.knowledge_ids)
            .enumerate()
            .map(|(i, (&q, &k))| {
                let label = self.correctness.as_ref().and_then(|c| c.get(i).copied());
                (q, k, label)
            })
    }
}

// ---------------------------------------------------------------------------
// ItemRecord
// ---------------------------------------------------------------------------

/// One entry of `items.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Unique item (question) identifier.
    pub id: i64,
    /// Knowledge component the item exercises.
    pub knowledge: i64,
    /// Observed failure rate, or [`NEUTRAL_DIFFICULTY`] with no observations.
    pub difficulty: f64,
    /// Placeholder for downstream enrichment; always empty here.
    #[serde(default)]
    pub content: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// KnowledgeIndex / LearningOrder
// ---------------------------------------------------------------------------

/// `know_item.json`: knowledge id → ascending item ids.
///
/// Serializes as a JSON object whose keys are the decimal knowledge ids,
/// in ascending numeric order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnowledgeIndex(pub BTreeMap<i64, Vec<i64>>);

impl KnowledgeIndex {
    pub fn get(&self, knowledge: i64) -> Option<&[i64]> {
        self.0.get(&knowledge).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `learning_order.json`: distinct knowledge ids, most frequent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LearningOrder(pub Vec<i64>);

impl LearningOrder {
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// KnowledgePolicy
// ---------------------------------------------------------------------------

/// How an item's knowledge id is chosen when the raw data associates one
/// question with several knowledge ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KnowledgePolicy {
    /// Knowledge id of the first observation.
    #[default]
    FirstSeen,
    /// Most frequent knowledge id; ties go to the earliest observed.
    Majority,
    /// Fail the run on any conflicting observation.
    Reject,
}

impl KnowledgePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstSeen => "first-seen",
            Self::Majority => "majority",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for KnowledgePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KnowledgePolicy {
    type Err = EduMetaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "first-seen" => Ok(Self::FirstSeen),
            "majority" => Ok(Self::Majority),
            "reject" => Ok(Self::Reject),
            other => Err(EduMetaError::config(format!(
                "unknown knowledge policy '{other}': expected 'first-seen', 'majority', or 'reject'"
            ))),
        }
    }
}
