// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Incremental location search
//
// One shared component for the city, area and locality flows:
// local substring filter, debounced remote search and de-duplicated merge.

mod controller;
mod session;

pub use controller::{SearchCommand, SearchConfig, SearchController};
pub use session::{RemoteApplied, RemoteRequest, SearchPhase, SearchSession, SearchUpdate};
