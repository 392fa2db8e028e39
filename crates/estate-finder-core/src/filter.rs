// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Local candidate filter
//
// Substring filtering over the already-loaded candidate list.
// Runs synchronously so the local result can be shown before the
// remote search returns.

use crate::types::Candidate;

/// Filter `candidates` to those whose name contains `query`, ignoring case.
///
/// Input order is preserved. A blank query yields an empty list rather
/// than the full list, so nothing is shown until the user types.
pub fn filter_local(candidates: &[Candidate], query: &str) -> Vec<Candidate> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    candidates
        .iter()
        .filter(|candidate| candidate.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
