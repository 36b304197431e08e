//! Knowledge-to-item index builder.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use edumeta_shared::{ItemRecord, KnowledgeIndex};

/// Group item ids by knowledge id. Keys and each id list are ascending.
#[instrument(skip_all, fields(items = items.len()))]
pub fn build_know_item(items: &[ItemRecord]) -> KnowledgeIndex {
    let mut groups: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for item in items {
        groups.entry(item.knowledge).or_default().push(item.id);
    }

    // Already ascending when `items` comes from `build_items`.
    for ids in groups.values_mut() {
        ids.sort_unstable();
    }

    debug!(knowledge = groups.len(), "knowledge index built");
    KnowledgeIndex(groups)
}
