use std::collections::HashSet;

use itertools::Itertools;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::core::event_data::EventLogAccess;

/// Boolean activity-occurrence encoding of a log
///
/// Row `i` states for each activity (in the order of `activities`) whether it occurs in trace `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceEncoding {
    /// Sorted activities (columns)
    pub activities: Vec<String>,
    /// One row per trace
    pub rows: Vec<Vec<bool>>,
}

impl OccurrenceEncoding {
    /// Encode a log
    pub fn from_log<L: EventLogAccess + ?Sized>(log: &L) -> Self {
        let activities = log.get_activities();
        let rows = log
            .iter_traces()
            .map(|t| {
                let occurring: HashSet<&str> =
                    t.events.iter().map(|e| e.activity.as_str()).collect();
                activities
                    .iter()
                    .map(|a| occurring.contains(a.as_str()))
                    .collect()
            })
            .collect();
        Self { activities, rows }
    }

    /// Fraction of rows containing all given columns
    fn support(&self, items: &[usize]) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let count = self
            .rows
            .iter()
            .filter(|row| items.iter().all(|i| row[*i]))
            .count();
        count as f64 / self.rows.len() as f64
    }
}

/// Set of activities occurring together in at least a `support` fraction of traces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrequentItemset {
    /// Activities (sorted)
    pub items: Vec<String>,
    /// Fraction of traces containing all `items`
    pub support: f64,
}

/// Apriori on the activity-occurrence encoding of a log
///
/// Returns all itemsets with `1..=max_len` activities and a support of at least `min_support`,
/// ordered by size and then lexicographically. An empty log has no frequent itemsets.
pub fn frequent_itemsets<L: EventLogAccess + ?Sized>(
    log: &L,
    min_support: f64,
    max_len: usize,
) -> Vec<FrequentItemset> {
    let encoding = OccurrenceEncoding::from_log(log);
    if encoding.rows.is_empty() {
        return Vec::new();
    }
    let mut ret = Vec::new();
    let mut level: Vec<(Vec<usize>, f64)> = (0..encoding.activities.len())
        .map(|i| (vec![i], encoding.support(&[i])))
        .filter(|(_, s)| *s >= min_support)
        .collect();
    let mut len = 1;
    while !level.is_empty() && len <= max_len {
        let frequent: HashSet<&Vec<usize>> = level.iter().map(|(items, _)| items).collect();
        let next: Vec<(Vec<usize>, f64)> = if len < max_len {
            level
                .iter()
                .tuple_combinations()
                .filter(|((a, _), (b, _))| a[..len - 1] == b[..len - 1])
                .filter_map(|((a, _), (b, _))| {
                    let mut candidate = a.clone();
                    candidate.push(b[len - 1]);
                    candidate.sort_unstable();
                    let all_subsets_frequent = candidate
                        .iter()
                        .copied()
                        .combinations(len)
                        .all(|subset| frequent.contains(&subset));
                    if !all_subsets_frequent {
                        return None;
                    }
                    let support = encoding.support(&candidate);
                    (support >= min_support).then_some((candidate, support))
                })
                .sorted_by(|(a, _), (b, _)| a.cmp(b))
                .collect()
        } else {
            Vec::new()
        };
        ret.extend(level.into_iter().map(|(items, support)| FrequentItemset {
            items: items
                .into_iter()
                .map(|i| encoding.activities[i].clone())
                .collect(),
            support,
        }));
        level = next;
        len += 1;
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log;

    #[test]
    fn occurrence_encoding() {
        let log = event_log!(["b", "a", "a"], ["c"]);
        let enc = OccurrenceEncoding::from_log(&log);
        assert_eq!(enc.activities, vec!["a", "b", "c"]);
        assert_eq!(
            enc.rows,
            vec![vec![true, true, false], vec![false, false, true]]
        );
    }

    #[test]
    fn apriori_levels() {
        let log = event_log!(
            ["a", "b", "c"],
            ["a", "b"],
            ["a", "c"],
            ["a", "b", "d"],
        );
        let sets = frequent_itemsets(&log, 0.5, 2);
        let items: Vec<Vec<&str>> = sets
            .iter()
            .map(|s| s.items.iter().map(String::as_str).collect())
            .collect();
        assert_eq!(
            items,
            vec![
                vec!["a"],
                vec!["b"],
                vec!["c"],
                vec!["a", "b"],
                vec!["a", "c"],
            ]
        );
        assert_eq!(sets[0].support, 1.0);
        assert_eq!(sets[3].support, 0.75);

        // {a, b, c} only occurs once
        let sets = frequent_itemsets(&log, 0.5, 3);
        assert!(sets.iter().all(|s| s.items.len() <= 2));
        let sets = frequent_itemsets(&log, 0.25, 3);
        assert!(sets
            .iter()
            .any(|s| s.items == vec!["a", "b", "c"] && s.support == 0.25));
        assert_eq!(frequent_itemsets(&log, 0.5, 1).len(), 3);
    }

    #[test]
    fn empty_log_has_no_itemsets() {
        let log = event_log!();
        assert!(frequent_itemsets(&log, 0.0, 2).is_empty());
    }
}
