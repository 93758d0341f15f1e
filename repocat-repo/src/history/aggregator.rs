//! Running per-author and per-month statistics

use repocat_core::{CommitDelta, StatisticsSnapshot};

/// Folds commit deltas into a statistics snapshot.
///
/// Deltas must be applied oldest first and exactly once each: author names are
/// overwritten by the latest commit and nothing is deduplicated. Counters
/// saturate at `u64::MAX`.
#[derive(Debug, Default)]
pub struct StatisticsAggregator {
    snapshot: StatisticsSnapshot,
}

impl StatisticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, delta: &CommitDelta) {
        let author = self
            .snapshot
            .authors
            .entry(delta.author_email.clone())
            .or_default();

        author.name.clone_from(&delta.author_name);
        author.commits = author.commits.saturating_add(1);
        author.insertions = author.insertions.saturating_add(delta.insertions);
        author.deletions = author.deletions.saturating_add(delta.deletions);

        let bucket = self
            .snapshot
            .histogram
            .entry(delta.month_bucket())
            .or_insert(0);
        *bucket = bucket.saturating_add(1);
    }

    pub fn snapshot(&self) -> &StatisticsSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> StatisticsSnapshot {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn delta(date: &str, name: &str, email: &str, insertions: u64, deletions: u64) -> CommitDelta {
        CommitDelta {
            timestamp: DateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S %z").unwrap(),
            commit_hash: format!("{}-{}", email, date),
            author_name: name.to_string(),
            author_email: email.to_string(),
            files_changed: 1,
            insertions,
            deletions,
        }
    }

    #[test]
    fn test_last_name_wins() {
        let mut aggregator = StatisticsAggregator::new();
        aggregator.apply(&delta("2024-01-15 10:00:00 +0000", "Jane Doe", "jane@example.com", 10, 2));
        aggregator.apply(&delta("2024-01-20 10:00:00 +0000", "Jane Smith", "jane@example.com", 5, 1));

        let snapshot = aggregator.into_snapshot();
        let jane = &snapshot.authors["jane@example.com"];
        assert_eq!(jane.name, "Jane Smith");
        assert_eq!(jane.commits, 2);
        assert_eq!(jane.insertions, 15);
        assert_eq!(jane.deletions, 3);
        assert_eq!(snapshot.histogram["202401"], 2);
    }

    #[test]
    fn test_histogram_buckets() {
        let mut aggregator = StatisticsAggregator::new();
        aggregator.apply(&delta("2024-01-15 10:00:00 +0000", "A", "a@x", 1, 0));
        aggregator.apply(&delta("2024-01-31 10:00:00 +0000", "B", "b@x", 1, 0));
        aggregator.apply(&delta("2024-02-01 10:00:00 +0000", "A", "a@x", 1, 0));

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.histogram.len(), 2);
        assert_eq!(snapshot.histogram["202401"], 2);
        assert_eq!(snapshot.histogram["202402"], 1);
        assert_eq!(snapshot.total_commits(), 3);
        assert_eq!(snapshot.author_count(), 2);
        assert!(snapshot.authors.values().all(|a| a.commits >= 1));
    }

    #[test]
    fn test_counters_saturate() {
        let mut aggregator = StatisticsAggregator::new();
        let d = delta("2024-01-15 10:00:00 +0000", "A", "a@x", u64::MAX, u64::MAX);
        aggregator.apply(&d);
        aggregator.apply(&d);

        let author = &aggregator.snapshot().authors["a@x"];
        assert_eq!(author.commits, 2);
        assert_eq!(author.insertions, u64::MAX);
        assert_eq!(author.deletions, u64::MAX);
    }

    #[test]
    fn test_applying_twice_double_counts() {
        let mut aggregator = StatisticsAggregator::new();
        let d = delta("2024-01-15 10:00:00 +0000", "A", "a@x", 4, 4);
        aggregator.apply(&d);
        aggregator.apply(&d);

        assert_eq!(aggregator.snapshot().authors["a@x"].commits, 2);
        assert_eq!(aggregator.snapshot().authors["a@x"].insertions, 8);
    }
}
