//! Item catalog builder: one record per distinct question with an
//! estimated difficulty.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument, warn};

use edumeta_shared::{
    EduMetaError, Interactions, ItemRecord, KnowledgePolicy, NEUTRAL_DIFFICULTY, Result,
};

/// Per-question observations.
#[derive(Debug, Default)]
struct ItemAccumulator {
    /// Knowledge ids in first-observed order with their counts.
    knowledge: Vec<(i64, usize)>,
    /// Correctness values in observation order.
    labels: Vec<f64>,
}

impl ItemAccumulator {
    fn observe(&mut self, knowledge: i64, label: Option<f64>) {
        match self.knowledge.iter_mut().find(|(k, _)| *k == knowledge) {
            Some((_, count)) => *count += 1,
            None => self.knowledge.push((knowledge, 1)),
        }
        if let Some(label) = label {
            self.labels.push(label);
        }
    }

    fn has_conflict(&self) -> bool {
        self.knowledge.len() > 1
    }

    fn resolve_knowledge(&self, question_id: i64, policy: KnowledgePolicy) -> Result<i64> {
        let first = self.knowledge[0].0;
        match policy {
            KnowledgePolicy::FirstSeen => Ok(first),
            KnowledgePolicy::Majority => {
                let mut best = self.knowledge[0];
                for &candidate in &self.knowledge[1..] {
                    if candidate.1 > best.1 {
                        best = candidate;
                    }
                }
                Ok(best.0)
            }
            KnowledgePolicy::Reject if self.has_conflict() => {
                Err(EduMetaError::KnowledgeConflict {
                    question_id,
                    knowledge_ids: self.knowledge.iter().map(|(k, _)| *k).collect(),
                })
            }
            KnowledgePolicy::Reject => Ok(first),
        }
    }

    fn difficulty(&self) -> f64 {
        if self.labels.is_empty() {
            return NEUTRAL_DIFFICULTY;
        }
        let mean = self.labels.iter().sum::<f64>() / self.labels.len() as f64;
        1.0 - mean
    }
}

/// Build the item catalog, sorted ascending by id.
///
/// `difficulty = 1 - mean(correctness)` over the item's observations, or
/// [`NEUTRAL_DIFFICULTY`] when it has none. Values are not clamped.
#[instrument(skip_all, fields(observations = interactions.len(), policy = %policy))]
pub fn build_items(interactions: &Interactions, policy: KnowledgePolicy) -> Result<Vec<ItemRecord>> {
    let mut accumulators: BTreeMap<i64, ItemAccumulator> = BTreeMap::new();
    for (question_id, knowledge, label) in interactions.records() {
        accumulators
            .entry(question_id)
            .or_default()
            .observe(knowledge, label);
    }

    let mut conflicts = 0usize;
    let mut items = Vec::with_capacity(accumulators.len());

    for (id, acc) in &accumulators {
        let knowledge = acc.resolve_knowledge(*id, policy)?;
        if acc.has_conflict() {
            conflicts += 1;
            debug!(
                question_id = id,
                candidates = ?acc.knowledge,
                chosen = knowledge,
                "question observed with several knowledge ids"
            );
        }

        let difficulty = acc.difficulty();
        if !difficulty.is_finite() {
            return Err(EduMetaError::validation(format!(
                "question {id}: difficulty is not finite ({difficulty}); correctness values overflow"
            )));
        }

        items.push(ItemRecord {
            id: *id,
            knowledge,
            difficulty,
            content: serde_json::Map::new(),
        });
    }

    if conflicts > 0 {
        warn!(conflicts, policy = %policy, "questions with conflicting knowledge ids resolved by policy");
    }
    info!(items = items.len(), "item catalog built");

    Ok(items)
}
