//! Knowledge traversal order builder.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use tracing::{debug, instrument};

use edumeta_shared::LearningOrder;

/// Order distinct knowledge ids by descending frequency, ties broken by
/// ascending id.
#[instrument(skip_all, fields(observations = knowledge_ids.len()))]
pub fn build_learning_order(knowledge_ids: &[i64]) -> LearningOrder {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for &id in knowledge_ids {
        *counts.entry(id).or_default() += 1;
    }

    let mut ranked: Vec<(i64, usize)> = counts.into_iter().collect();
    ranked.sort_by_key(|&(id, count)| (Reverse(count), id));

    debug!(distinct = ranked.len(), "learning order built");
    LearningOrder(ranked.into_iter().map(|(id, _)| id).collect())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn orders_by_frequency() {
        let order = build_learning_order(&[1, 1, 2, 3, 3, 3]);
        assert_eq!(order.as_slice(), &[3, 1, 2]);
    }

    #[test]
    fn ties_break_by_ascending_id() {
        let order = build_learning_order(&[9, 4, 7, 4, 9, 7]);
        assert_eq!(order.as_slice(), &[4, 7, 9]);
    }

    #[test]
    fn empty_input_gives_empty_order() {
        assert!(build_learning_order(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn output_is_permutation_of_distinct_ids(ids in proptest::collection::vec(-20i64..20, 0..200)) {
            let order = build_learning_order(&ids);
            let distinct: BTreeSet<i64> = ids.iter().copied().collect();

            prop_assert_eq!(order.len(), distinct.len());
            let emitted: BTreeSet<i64> = order.as_slice().iter().copied().collect();
            prop_assert_eq!(emitted, distinct);
        }

        #[test]
        fn counts_never_increase_along_the_order(ids in proptest::collection::vec(0i64..10, 0..200)) {
            let order = build_learning_order(&ids);
            let count = |k: i64| ids.iter().filter(|&&x| x == k).count();
            for pair in order.as_slice().windows(2) {
                let (a, b) = (count(pair[0]), count(pair[1]));
                prop_assert!(a > b || (a == b && pair[0] < pair[1]));
            }
        }
    }
}
