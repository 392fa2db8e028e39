// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Application context
//
// Everything a frontend needs, created once at start and passed to each
// screen controller instead of living in globals.

use crate::api::{LocationApi, LocationService};
use crate::recent::RecentLocations;
use crate::search::{SearchConfig, SearchController};
use crate::selection::SelectionStore;
use crate::settings::SettingsStore;
use crate::source::{AreaSource, CandidateSource, CitySource, LocalitySource};
use crate::storage::{FileStorage, KeyValueStorage};
use crate::types::{AppError, AppSettings, Candidate, CandidateKind, SelectionState, SettingsOverrides};
use std::sync::Arc;

/// Application state shared by all screens
pub struct AppContext {
    pub settings: SettingsStore,
    pub selection: SelectionStore,
    pub recent: RecentLocations,
    overrides: SettingsOverrides,
    service: Arc<dyn LocationService>,
}

impl AppContext {
    /// Create the context with stores in the platform config directory
    pub fn new() -> Result<Self, AppError> {
        Self::with_storage(Arc::new(FileStorage::new()?))
    }

    /// Create the context on `storage`, talking HTTP to the configured API
    pub fn with_storage(storage: Arc<dyn KeyValueStorage>) -> Result<Self, AppError> {
        Self::with_overrides(storage, SettingsOverrides::default())
    }

    /// Like [`AppContext::with_storage`], with per-run setting overrides
    pub fn with_overrides(
        storage: Arc<dyn KeyValueStorage>,
        overrides: SettingsOverrides,
    ) -> Result<Self, AppError> {
        let settings = SettingsStore::new(storage.clone())?;
        let api = LocationApi::new(&overrides.apply(settings.get()))?;
        Self::assemble(storage, settings, overrides, Arc::new(api))
    }

    /// Create the context with an explicit location service
    pub fn with_service(
        storage: Arc<dyn KeyValueStorage>,
        service: Arc<dyn LocationService>,
    ) -> Result<Self, AppError> {
        let settings = SettingsStore::new(storage.clone())?;
        Self::assemble(storage, settings, SettingsOverrides::default(), service)
    }

    fn assemble(
        storage: Arc<dyn KeyValueStorage>,
        settings: SettingsStore,
        overrides: SettingsOverrides,
        service: Arc<dyn LocationService>,
    ) -> Result<Self, AppError> {
        let max_recent = settings.get().max_recent_locations;
        let selection = SelectionStore::new(storage.clone())?;
        let recent = RecentLocations::new(storage, max_recent)?;

        Ok(Self {
            settings,
            selection,
            recent,
            overrides,
            service,
        })
    }

    /// Stored settings with this run's overrides applied
    pub fn effective_settings(&self) -> AppSettings {
        self.overrides.apply(self.settings.get())
    }

    pub fn service(&self) -> Arc<dyn LocationService> {
        self.service.clone()
    }

    /// Replace the current selection and remember it
    pub fn select(&self, state: SelectionState) -> Result<(), AppError> {
        tracing::info!("Selected location: {}", state.display_name);
        self.selection.replace(state.clone())?;
        self.recent.add(state)
    }

    /// Narrow the current selection to `candidate` and store the result
    pub fn choose(&self, candidate: &Candidate) -> Result<SelectionState, AppError> {
        let next = self.selection.get().narrowed(candidate)?;
        self.select(next.clone())?;
        Ok(next)
    }

    /// Candidate source for `kind`, scoped to the current selection
    pub fn source_for(&self, kind: CandidateKind) -> Result<Arc<dyn CandidateSource>, AppError> {
        let current = self.selection.get();
        let city = current.city_id.map(|id| (id, current.city_name.clone()));

        let source: Arc<dyn CandidateSource> = match (kind, city) {
            (CandidateKind::City, _) => Arc::new(CitySource::new(self.service())),
            (CandidateKind::Area, Some((city_id, city_name))) => {
                Arc::new(AreaSource::new(self.service(), city_id, city_name))
            }
            (CandidateKind::Locality, Some((city_id, city_name))) => {
                let source = LocalitySource::new(self.service(), city_id, city_name);
                match current.area_id {
                    Some(area_id) => Arc::new(source.within_area(area_id)),
                    None => Arc::new(source),
                }
            }
            (kind, None) => {
                return Err(AppError::NotFound(format!(
                    "No city selected; choose a city before searching {}",
                    kind.label().to_lowercase()
                )))
            }
        };
        Ok(source)
    }

    /// Start a search for `kind` with the configured debounce
    pub fn start_search(&self, kind: CandidateKind) -> Result<SearchController, AppError> {
        let source = self.source_for(kind)?;
        let config = SearchConfig::for_source(source.as_ref(), self.effective_settings().debounce());
        Ok(SearchController::spawn(source, config))
    }
}
