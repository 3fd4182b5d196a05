use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::NodeVersion;

/// Most versions kept per major line in the available-versions listing.
pub const GROUP_CAP: usize = 5;

/// Sort version strings newest first. Entries that are not `X.Y.Z` triples
/// keep their relative order after every parsed entry.
#[must_use]
pub fn sort_descending(versions: &[String]) -> Vec<String> {
    let mut sorted = versions.to_vec();
    sorted.sort_by_cached_key(|value| Reverse(value.parse::<NodeVersion>().ok()));
    sorted
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionGroup {
    pub major: u32,
    pub versions: Vec<NodeVersion>,
}

/// Bucket versions by major, newest major first, each bucket sorted
/// descending and cut to `cap` entries. Unparseable entries are dropped.
#[must_use]
pub fn group_by_major(versions: &[String], cap: usize) -> Vec<VersionGroup> {
    let mut groups: BTreeMap<u32, Vec<NodeVersion>> = BTreeMap::new();

    for version in versions.iter().filter_map(|v| v.parse::<NodeVersion>().ok()) {
        groups.entry(version.major).or_default().push(version);
    }

    groups
        .into_iter()
        .rev()
        .map(|(major, mut versions)| {
            versions.sort_by(|a, b| b.cmp(a));
            versions.dedup();
            versions.truncate(cap);
            VersionGroup { major, versions }
        })
        .collect()
}

#[must_use]
pub fn flatten_groups(groups: &[VersionGroup]) -> Vec<String> {
    groups
        .iter()
        .flat_map(|group| group.versions.iter().map(ToString::to_string))
        .collect()
}
