//! Per-principal task statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts per lower-cased status, plus the overall total
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub by_status: BTreeMap<String, i64>,
    pub total: i64,
}

impl TaskStats {
    /// Fold `(status, count)` rows; statuses differing only in case are merged
    pub fn from_counts<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        let mut stats = TaskStats::default();
        for (status, count) in rows {
            *stats
                .by_status
                .entry(status.as_ref().to_lowercase())
                .or_insert(0) += count;
            stats.total += count;
        }
        stats
    }

    pub fn count(&self, status: &str) -> i64 {
        self.by_status.get(status).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses_are_lowercased_and_merged() {
        let stats = TaskStats::from_counts(vec![("Pending", 2), ("pending", 1), ("completed", 4)]);
        assert_eq!(stats.count("pending"), 3);
        assert_eq!(stats.count("completed"), 4);
        assert_eq!(stats.count("in_progress"), 0);
        assert_eq!(stats.total, 7);
    }
}
