// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Recent locations
//
// Remembers the last few distinct selections, most recent first.

use crate::storage::KeyValueStorage;
use crate::types::{AppError, SelectionState};
use std::sync::{Arc, PoisonError, RwLock};

const RECENT_KEY: &str = "recent_locations";

#[derive(serde::Serialize, serde::Deserialize)]
struct RecentFile {
    locations: Vec<SelectionState>,
}

/// Bounded list of recently chosen locations
pub struct RecentLocations {
    locations: RwLock<Vec<SelectionState>>,
    max_entries: usize,
    storage: Arc<dyn KeyValueStorage>,
}

impl RecentLocations {
    /// Load recent locations from storage if available
    pub fn new(storage: Arc<dyn KeyValueStorage>, max_entries: usize) -> Result<Self, AppError> {
        let mut locations = match storage.load(RECENT_KEY)? {
            Some(content) => match serde_json::from_str::<RecentFile>(&content) {
                Ok(file) => file.locations,
                Err(e) => {
                    tracing::warn!("Failed to parse recent locations, starting fresh: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        locations.truncate(max_entries);

        Ok(Self {
            locations: RwLock::new(locations),
            max_entries,
            storage,
        })
    }

    fn persist(&self) -> Result<(), AppError> {
        let content = {
            let locations = self.locations.read().unwrap_or_else(PoisonError::into_inner);
            let file = RecentFile {
                locations: locations.clone(),
            };
            serde_json::to_string_pretty(&file).map_err(|e| {
                AppError::Serialization(format!("Failed to serialize recent locations: {}", e))
            })?
        };

        self.storage.save(RECENT_KEY, &content)
    }

    /// All recent locations, newest first
    pub fn list(&self) -> Vec<SelectionState> {
        self.locations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record a selection; an earlier entry for the same place moves to the front
    pub fn add(&self, location: SelectionState) -> Result<(), AppError> {
        if location.is_empty() {
            return Ok(());
        }

        {
            let mut locations = self.locations.write().unwrap_or_else(PoisonError::into_inner);
            locations.retain(|existing| !existing.same_place(&location));
            locations.insert(0, location);
            locations.truncate(self.max_entries);
        }

        self.persist()
    }

    /// Forget all recent locations
    pub fn clear(&self) -> Result<(), AppError> {
        {
            let mut locations = self.locations.write().unwrap_or_else(PoisonError::into_inner);
            locations.clear();
        }

        self.persist()
    }

    pub fn count(&self) -> usize {
        self.locations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_newest_first_and_bounded() {
        let recent = RecentLocations::new(Arc::new(MemoryStorage::new()), 2).unwrap();
        recent.add(SelectionState::city(1, "Delhi")).unwrap();
        recent.add(SelectionState::city(2, "Jaipur")).unwrap();
        recent.add(SelectionState::city(3, "Pune")).unwrap();

        let names: Vec<String> = recent.list().into_iter().map(|s| s.city_name).collect();
        assert_eq!(names, vec!["Pune", "Jaipur"]);
    }

    #[test]
    fn test_same_place_moves_to_front() {
        let recent = RecentLocations::new(Arc::new(MemoryStorage::new()), 5).unwrap();
        recent.add(SelectionState::city(1, "Delhi")).unwrap();
        recent.add(SelectionState::city(2, "Jaipur")).unwrap();
        recent.add(SelectionState::city(1, "Delhi")).unwrap();

        assert_eq!(recent.count(), 2);
        assert_eq!(recent.list()[0].city_name, "Delhi");
    }

    #[test]
    fn test_empty_selection_ignored() {
        let recent = RecentLocations::new(Arc::new(MemoryStorage::new()), 5).unwrap();
        recent.add(SelectionState::default()).unwrap();
        assert_eq!(recent.count(), 0);
    }

    #[test]
    fn test_persisted_and_cleared() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let recent = RecentLocations::new(storage.clone(), 5).unwrap();
            recent.add(SelectionState::city(1, "Delhi")).unwrap();
        }
        let recent = RecentLocations::new(storage.clone(), 5).unwrap();
        assert_eq!(recent.count(), 1);

        recent.clear().unwrap();
        assert_eq!(RecentLocations::new(storage, 5).unwrap().count(), 0);
    }
}
