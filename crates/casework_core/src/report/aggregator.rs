//! Generic counting primitives.

use serde::Serialize;
use std::collections::BTreeMap;

/// Counts per bucket key plus the number of records seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub buckets: BTreeMap<String, u64>,
    pub total: u64,
}

impl BucketCounts {
    pub fn get(&self, key: &str) -> u64 {
        self.buckets.get(key).copied().unwrap_or(0)
    }
}

/// Counts records per key produced by `bucket_fn`.
///
/// A record may land in zero, one or many buckets; it always adds one to
/// `total`.
pub fn count_by<T, F, I>(records: &[T], bucket_fn: F) -> BucketCounts
where
    F: Fn(&T) -> I,
    I: IntoIterator<Item = String>,
{
    let mut counts = BucketCounts::default();
    for record in records {
        counts.total += 1;
        for key in bucket_fn(record) {
            *counts.buckets.entry(key).or_insert(0) += 1;
        }
    }
    counts
}

/// Number of records satisfying `predicate`.
pub fn count_where<T, F>(records: &[T], predicate: F) -> u64
where
    F: Fn(&T) -> bool,
{
    records.iter().filter(|record| predicate(record)).count() as u64
}

/// Arithmetic mean, `None` for an empty input.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0_f64, 0_u64), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Demographic bracket label of an age in whole years.
pub fn age_bracket(age: u32) -> &'static str {
    match age {
        0..=17 => "0-17",
        18..=29 => "18-29",
        30..=44 => "30-44",
        45..=59 => "45-59",
        _ => "60+",
    }
}

#[cfg(test)]
mod tests {
    use super::{age_bracket, count_by, count_where, mean};

    #[test]
    fn total_counts_records_not_bucket_hits() {
        let rows = vec![vec!["a", "b"], vec![], vec!["a"]];
        let counts = count_by(&rows, |row| row.iter().map(|key| key.to_string()).collect::<Vec<_>>());
        assert_eq!(counts.total, 3);
        assert_eq!(counts.get("a"), 2);
        assert_eq!(counts.get("b"), 1);
        assert_eq!(counts.get("c"), 0);
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean(Vec::<f64>::new()), None);
        assert_eq!(mean([45.0, 38.0, 31.0]), Some(38.0));
    }

    #[test]
    fn brackets_use_half_open_boundaries() {
        assert_eq!(age_bracket(17), "0-17");
        assert_eq!(age_bracket(18), "18-29");
        assert_eq!(age_bracket(44), "30-44");
        assert_eq!(age_bracket(45), "45-59");
        assert_eq!(age_bracket(60), "60+");
    }

    #[test]
    fn count_where_counts_matches() {
        assert_eq!(count_where(&[1, 2, 3, 4], |value| value % 2 == 0), 2);
    }
}
