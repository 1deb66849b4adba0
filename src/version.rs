//! Dotted version string comparison and range selection.
//!
//! Versions compare numerically segment-by-segment; missing segments count as
//! zero, so `1.2` and `1.2.0` are equal. A leading `v` on catalog tags is
//! stripped before comparison. Non-numeric segments also count as zero.

use std::cmp::Ordering;

/// Strip a single leading `v`/`V` from a version tag.
pub fn strip_tag_prefix(tag: &str) -> &str {
    tag.strip_prefix('v')
        .or_else(|| tag.strip_prefix('V'))
        .unwrap_or(tag)
}

fn segments(version: &str) -> Vec<u64> {
    strip_tag_prefix(version)
        .split('.')
        .map(|s| s.trim().parse::<u64>().unwrap_or(0))
        .collect()
}

/// Compare two dotted versions numerically, left-to-right.
pub fn compare(a: &str, b: &str) -> Ordering {
    let pa = segments(a);
    let pb = segments(b);

    for i in 0..pa.len().max(pb.len()) {
        let x = pa.get(i).copied().unwrap_or(0);
        let y = pb.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Inclusive range check: `version >= low` (if given) and `version <= high`
/// (if given). No bounds means everything is in range.
pub fn in_range(version: &str, low: Option<&str>, high: Option<&str>) -> bool {
    if let Some(low) = low {
        if compare(version, low) == Ordering::Less {
            return false;
        }
    }
    if let Some(high) = high {
        if compare(version, high) == Ordering::Greater {
            return false;
        }
    }
    true
}

/// Filter `entries` to those whose version is within `[low, high]`, then
/// sort ascending. `version_of` projects the version string out of an entry.
pub fn select_and_sort<T, F>(
    entries: Vec<T>,
    low: Option<&str>,
    high: Option<&str>,
    version_of: F,
) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut selected: Vec<T> = entries
        .into_iter()
        .filter(|e| in_range(version_of(e), low, high))
        .collect();
    selected.sort_by(|a, b| compare(version_of(a), version_of(b)));
    selected
}

/// True when two tags denote the same version, ignoring the `v` prefix.
pub fn tags_equal(a: &str, b: &str) -> bool {
    strip_tag_prefix(a) == strip_tag_prefix(b)
}
