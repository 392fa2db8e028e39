// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Search session state machine
//
// Pure state for one search field: no timers and no I/O. The controller
// feeds it settle events and remote outcomes and publishes its snapshots.

use crate::filter::filter_local;
use crate::merge::merge;
use crate::types::{AppError, Candidate, LocationQuery};
use serde::Serialize;

/// Where a search session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchPhase {
    /// Nothing typed, nothing shown
    Idle,
    /// Local matches shown, no remote search needed
    Filtering,
    /// Local matches shown, remote search in flight
    AwaitingRemote,
    /// Local and remote results merged
    Merged,
    /// Remote search failed, local matches shown
    Error,
}

/// Request to issue after a settle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequest {
    pub generation: u64,
    pub query: LocationQuery,
}

/// What happened to a remote outcome handed to the session
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteApplied {
    /// Result belonged to a superseded query and was dropped
    Stale,
    Merged,
    Failed(AppError),
}

/// Snapshot of what the field should display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchUpdate {
    pub generation: u64,
    pub phase: SearchPhase,
    pub query: String,
    pub candidates: Vec<Candidate>,
    /// Transient message for the user, e.g. a failed search
    pub notice: Option<String>,
}

/// State of one search field
#[derive(Debug)]
pub struct SearchSession {
    local: Vec<Candidate>,
    city_filter: Option<String>,
    city_id: Option<i64>,
    remote_enabled: bool,
    generation: u64,
    phase: SearchPhase,
    query: String,
    local_matches: Vec<Candidate>,
    /// Last remote result applied for the current query
    remote: Vec<Candidate>,
    displayed: Vec<Candidate>,
}

impl SearchSession {
    pub fn new(city_filter: Option<String>, city_id: Option<i64>) -> Self {
        Self {
            local: Vec::new(),
            city_filter,
            city_id,
            remote_enabled: true,
            generation: 0,
            phase: SearchPhase::Idle,
            query: String::new(),
            local_matches: Vec::new(),
            remote: Vec::new(),
            displayed: Vec::new(),
        }
    }

    /// Never ask for remote results; settled input is only filtered locally
    pub fn local_only(mut self) -> Self {
        self.remote_enabled = false;
        self
    }

    /// Replace the preloaded list; the current query is filtered again
    pub fn set_local(&mut self, candidates: Vec<Candidate>) {
        self.local = candidates;
        if self.phase == SearchPhase::Idle {
            return;
        }

        self.local_matches = filter_local(&self.local, &self.query);
        self.displayed = if self.phase == SearchPhase::Merged {
            merge(&self.local_matches, &self.remote, self.city_filter.as_deref())
        } else {
            self.local_matches.clone()
        };
    }

    /// Handle settled input.
    ///
    /// Starts a new generation, shows the local matches right away and
    /// returns the remote request to issue, unless the query is blank or
    /// the session is local-only.
    pub fn settle(&mut self, text: &str) -> Option<RemoteRequest> {
        self.generation += 1;
        self.query = text.trim().to_string();

        if self.query.is_empty() {
            self.reset();
            return None;
        }

        self.local_matches = filter_local(&self.local, &self.query);
        self.remote.clear();
        self.displayed = self.local_matches.clone();
        if !self.remote_enabled {
            self.phase = SearchPhase::Filtering;
            return None;
        }
        self.phase = SearchPhase::AwaitingRemote;

        Some(RemoteRequest {
            generation: self.generation,
            query: LocationQuery::new(self.query.clone(), self.city_id),
        })
    }

    /// Apply the outcome of the remote search started at `generation`
    pub fn apply_remote(
        &mut self,
        generation: u64,
        result: Result<Vec<Candidate>, AppError>,
    ) -> RemoteApplied {
        if generation != self.generation || self.phase != SearchPhase::AwaitingRemote {
            tracing::debug!(
                "Dropping stale search result (generation {}, current {})",
                generation,
                self.generation
            );
            return RemoteApplied::Stale;
        }

        match result {
            Ok(remote) => {
                self.displayed = merge(&self.local_matches, &remote, self.city_filter.as_deref());
                self.remote = remote;
                self.phase = SearchPhase::Merged;
                RemoteApplied::Merged
            }
            Err(e) => {
                self.displayed = self.local_matches.clone();
                self.phase = SearchPhase::Error;
                RemoteApplied::Failed(e)
            }
        }
    }

    /// Clear the field; any outstanding remote result becomes stale
    pub fn clear(&mut self) {
        self.generation += 1;
        self.query.clear();
        self.reset();
    }

    fn reset(&mut self) {
        self.local_matches.clear();
        self.remote.clear();
        self.displayed.clear();
        self.phase = SearchPhase::Idle;
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn displayed(&self) -> &[Candidate] {
        &self.displayed
    }

    pub fn snapshot(&self, notice: Option<String>) -> SearchUpdate {
        SearchUpdate {
            generation: self.generation,
            phase: self.phase,
            query: self.query.clone(),
            candidates: self.displayed.clone(),
            notice,
        }
    }
}
