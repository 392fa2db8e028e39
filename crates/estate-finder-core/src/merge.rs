// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Result merger
//
// Combines the local filter result with a remote search result.

use crate::types::Candidate;
use std::collections::HashSet;

/// Merge local and remote candidates into one list with unique ids.
///
/// Remote records from other cities are dropped when `city_filter` is set.
/// Local records come first in their original order; a remote record whose
/// id is already present locally is replaced by the local one, and the
/// remaining remote records follow. The first occurrence of an id wins.
pub fn merge(local: &[Candidate], remote: &[Candidate], city_filter: Option<&str>) -> Vec<Candidate> {
    let mut seen = HashSet::with_capacity(local.len() + remote.len());
    let mut merged = Vec::with_capacity(local.len() + remote.len());

    for candidate in local {
        if seen.insert(candidate.id) {
            merged.push(candidate.clone());
        }
    }

    let mut dropped = 0usize;
    for candidate in remote {
        if let Some(city) = city_filter {
            if candidate.city_name != city {
                dropped += 1;
                continue;
            }
        }
        if seen.insert(candidate.id) {
            merged.push(candidate.clone());
        }
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} remote candidates outside {:?}", dropped, city_filter);
    }

    merged
}
