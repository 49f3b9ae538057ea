//! Ledgerline test utilities.
//!
//! Helpers for integration testing: synthetic joined-row fixtures, ordering
//! assertions for denormalizer input, and database test gating.

use std::fmt::Debug;

use chrono::NaiveDate;
use uuid::Uuid;

/// `DATABASE_URL`, if set. Database-backed tests return early without it.
pub fn test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
}

/// A tag unique to this call, for naming fixtures in a shared database.
pub fn unique_tag(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::now_v7().simple())
}

/// Calendar date shorthand for fixtures.
///
/// # Panics
///
/// Panics on an invalid date.
#[allow(clippy::expect_used)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}

// =============================================================================
// Synthetic joined rows
// =============================================================================

/// One flat `(parent, child)` row as a LEFT JOIN produces it.
pub type KeyedRow = (i64, Option<i64>);

/// Build parent-ordered rows: parent `i + 1` gets `children[i]` child rows,
/// or a single `(parent, None)` row when it has none.
///
/// Child ids are unique across the whole fixture and start at 1.
pub fn keyed_rows(children: &[usize]) -> Vec<KeyedRow> {
    let mut rows = Vec::new();
    let mut next_child = 1i64;
    for (parent, &count) in (1i64..).zip(children) {
        if count == 0 {
            rows.push((parent, None));
            continue;
        }
        for _ in 0..count {
            rows.push((parent, Some(next_child)));
            next_child += 1;
        }
    }
    rows
}

/// Parent keys of a fixture, in row order.
pub fn parent_keys(rows: &[KeyedRow]) -> Vec<i64> {
    rows.iter().map(|(parent, _)| *parent).collect()
}

// =============================================================================
// Ordering assertions
// =============================================================================

/// Assert each key occupies a single contiguous run.
///
/// This is the only ordering the denormalizer relies on.
///
/// # Panics
///
/// Panics naming the first key that reappears after its run ended.
pub fn assert_contiguous_groups<K: PartialEq + Debug>(keys: &[K]) {
    let mut closed: Vec<&K> = Vec::new();
    let mut current: Option<&K> = None;
    for (index, key) in keys.iter().enumerate() {
        if current == Some(key) {
            continue;
        }
        assert!(
            !closed.contains(&key),
            "key {key:?} reappears at row {index} after its group ended"
        );
        if let Some(previous) = current {
            closed.push(previous);
        }
        current = Some(key);
    }
}

/// Assert a sequence never decreases.
///
/// # Panics
///
/// Panics at the first descending pair.
pub fn assert_non_decreasing<T: PartialOrd + Debug>(values: &[T]) {
    for (index, pair) in values.windows(2).enumerate() {
        assert!(
            pair[0] <= pair[1],
            "values descend at {index}: {:?} > {:?}",
            pair[0],
            pair[1]
        );
    }
}
