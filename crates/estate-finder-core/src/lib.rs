// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Shared logic for all frontends
//
// This crate provides:
// - Candidate, SelectionState, AppSettings and AppError types
// - The incremental location search (filter, merge, debounce, controller)
// - LocationApi, the HTTP wrapper over the listing and search endpoints
// - SettingsStore, SelectionStore and RecentLocations on a KeyValueStorage
// - AppContext tying the above together for a frontend
//
// Frontend-specific code lives in separate crates.

pub mod api;
pub mod context;
pub mod debounce;
pub mod filter;
pub mod merge;
pub mod recent;
pub mod search;
pub mod selection;
pub mod settings;
pub mod source;
pub mod storage;
pub mod types;

// Re-export commonly used items
pub use api::{LocationApi, LocationService};
pub use context::AppContext;
pub use debounce::Debouncer;
pub use filter::filter_local;
pub use merge::merge;
pub use recent::RecentLocations;
pub use search::{SearchCommand, SearchConfig, SearchController, SearchPhase, SearchUpdate};
pub use selection::SelectionStore;
pub use settings::SettingsStore;
pub use source::{AreaSource, CandidateSource, CitySource, LocalitySource};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use types::{
    AppError, AppSettings, Candidate, CandidateKind, LocationQuery, SelectionState,
    SettingsOverrides,
};
