//! Duplicate Detection Module
//!
//! Groups a flat list of bookmarks into buckets of equal normalized keys:
//! same URL, same title, or both. Each group keeps its members in input
//! order, so the first member is the stable "keep this one" recommendation
//! and repeated scans of the same input give the same groups.

use vbookmarks_core::*;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Scan `records` for duplicates.
///
/// - URL groups: records sharing `normalize_url(url)`.
/// - Title groups: records sharing `normalize_title(title)`, counting only
///   records that are not already in a URL group. Blank titles are ignored.
/// - Exact groups: records sharing both keys, always `Severity::High`.
///
/// Fails on records without a URL and on repeated ids.
pub fn find_duplicates(records: &[BookmarkRecord]) -> Result<DuplicateReport> {
    ensure_unique_ids(records)?;
    if let Some(folder) = records.iter().find(|r| r.url.is_empty()) {
        return Err(ValidationError::MissingUrl {
            id: folder.id.to_string(),
        }
        .into());
    }

    let url_keys: Vec<String> = records.iter().map(|r| normalize_url(&r.url)).collect();
    let title_keys: Vec<String> = records.iter().map(|r| normalize_title(&r.title)).collect();

    let url_buckets = bucket(url_keys.iter().cloned());
    let title_buckets = bucket(title_keys.iter().cloned());
    let exact_buckets = bucket(
        url_keys
            .iter()
            .zip(&title_keys)
            .map(|(url, title)| format!("{}|{}", url, title)),
    );

    let mut report = DuplicateReport::default();

    let mut in_url_group = HashSet::new();
    for (key, members) in url_buckets {
        if members.len() < 2 {
            continue;
        }
        in_url_group.extend(members.iter().copied());
        let severity = Severity::for_group_size(members.len());
        report
            .url_groups
            .insert(key.clone(), group(DuplicateKind::Url, key, &members, records, severity));
    }

    for (key, members) in title_buckets {
        if key.is_empty() {
            continue;
        }
        let remaining: Vec<usize> = members
            .into_iter()
            .filter(|i| !in_url_group.contains(i))
            .collect();
        if remaining.len() < 2 {
            continue;
        }
        let severity = Severity::for_group_size(remaining.len());
        report
            .title_groups
            .insert(key.clone(), group(DuplicateKind::Title, key, &remaining, records, severity));
    }

    for (key, members) in exact_buckets {
        if members.len() < 2 {
            continue;
        }
        report
            .exact_groups
            .insert(key.clone(), group(DuplicateKind::Exact, key, &members, records, Severity::High));
    }

    debug!(
        "Duplicate scan over {} bookmarks: {} URL, {} title, {} exact groups",
        records.len(),
        report.url_groups.len(),
        report.title_groups.len(),
        report.exact_groups.len()
    );
    Ok(report)
}

/// Positions of each key, in input order
fn bucket(keys: impl Iterator<Item = String>) -> BTreeMap<String, Vec<usize>> {
    let mut buckets: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (position, key) in keys.enumerate() {
        buckets.entry(key).or_default().push(position);
    }
    buckets
}

fn group(
    group_kind: DuplicateKind,
    key: String,
    positions: &[usize],
    records: &[BookmarkRecord],
    severity: Severity,
) -> DuplicateGroup {
    DuplicateGroup {
        group_kind,
        key,
        members: positions.iter().map(|&i| records[i].clone()).collect(),
        severity,
    }
}
