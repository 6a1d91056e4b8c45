//! Partition transfer records by group (CFL) for per-group export.
//!
//! # Architecture
//!
//! ```text
//! Input rows (CFL)    Output records         Groups
//! ┌──────────────┐    ┌──────────────┐       ┌───────────────────┐
//! │ row 0: HQ    │ →  │ record 0     │   →   │ HQ      → [0, 2]  │
//! │ row 1: Plant │ →  │ record 1     │       │ Plant   → [1]     │
//! │ row 2: HQ    │ →  │ record 2     │       └───────────────────┘
//! └──────────────┘    └──────────────┘
//! ```
//!
//! The group value is read from the *input* row: the grouping column is not
//! part of the output layout. Group order is always ascending so listings
//! and archive entries are reproducible.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{InputRow, OutputRecord};

/// Group value of a row, `None` when missing or blank.
fn group_value<'a>(row: &'a InputRow, column: &str) -> Option<&'a str> {
    row.get(column).filter(|v| !v.trim().is_empty())
}

/// Distinct non-missing group values, sorted ascending.
pub fn distinct_groups(rows: &[InputRow], column: &str) -> Vec<String> {
    rows.iter()
        .filter_map(|r| group_value(r, column))
        .map(String::from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Row count per group, sorted by group.
pub fn group_counts(rows: &[InputRow], column: &str) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in rows.iter().filter_map(|r| group_value(r, column)) {
        *counts.entry(value.to_string()).or_default() += 1;
    }
    counts.into_iter().collect()
}

/// Output records belonging to one group, in input order.
#[derive(Debug, Clone)]
pub struct RecordGroup<'a> {
    pub value: String,
    pub records: Vec<&'a OutputRecord>,
}

/// Partition `records` by the group value of the matching input row.
///
/// `rows` and `records` are parallel (same length and order). Only
/// `selected` groups are returned, deduplicated and ascending; selected
/// groups with no rows come back with an empty `records` list.
pub fn partition<'a, S: AsRef<str>>(
    rows: &[InputRow],
    records: &'a [OutputRecord],
    column: &str,
    selected: &[S],
) -> Vec<RecordGroup<'a>> {
    let mut groups: BTreeMap<String, Vec<&'a OutputRecord>> = selected
        .iter()
        .map(|s| (s.as_ref().to_string(), Vec::new()))
        .collect();

    for (row, record) in rows.iter().zip(records) {
        if let Some(bucket) = group_value(row, column).and_then(|v| groups.get_mut(v)) {
            bucket.push(record);
        }
    }

    groups
        .into_iter()
        .map(|(value, records)| RecordGroup { value, records })
        .collect()
}

/// Next group selection for a UI "select all / clear all" control.
///
/// Pure: the caller owns the previous selection. `select_all` wins over
/// `clear_all`; otherwise the previous selection is kept, minus values no
/// longer present, in `all_groups` order.
pub fn next_selection<S: AsRef<str>>(
    select_all: bool,
    clear_all: bool,
    previous: &[S],
    all_groups: &[String],
) -> Vec<String> {
    if select_all {
        return all_groups.to_vec();
    }
    if clear_all {
        return Vec::new();
    }
    let kept: BTreeSet<&str> = previous.iter().map(|s| s.as_ref()).collect();
    all_groups
        .iter()
        .filter(|g| kept.contains(g.as_str()))
        .cloned()
        .collect()
}
