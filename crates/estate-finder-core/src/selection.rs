// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Selection session state
//
// Holds the chosen city/area/locality. The state is only ever replaced
// as a whole and is written to storage after every change.

use crate::storage::KeyValueStorage;
use crate::types::{AppError, SelectionState};
use std::sync::{Arc, PoisonError, RwLock};

/// Storage key of the persisted selection
pub const LOCATION_KEY: &str = "location";

/// Current selection, restored at start and persisted on every replace
pub struct SelectionStore {
    state: RwLock<SelectionState>,
    storage: Arc<dyn KeyValueStorage>,
}

impl SelectionStore {
    /// Restore the last selection, or start empty
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Result<Self, AppError> {
        let state = match storage.load(LOCATION_KEY)? {
            Some(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse stored location, starting empty: {}", e);
                SelectionState::default()
            }),
            None => SelectionState::default(),
        };

        if !state.is_empty() {
            tracing::info!("Restored location: {}", state.display_name);
        }

        Ok(Self {
            state: RwLock::new(state),
            storage,
        })
    }

    /// Get the current selection
    pub fn get(&self) -> SelectionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the selection and persist it
    pub fn replace(&self, new_state: SelectionState) -> Result<(), AppError> {
        let content = serde_json::to_string(&new_state)
            .map_err(|e| AppError::Serialization(format!("Failed to serialize location: {}", e)))?;

        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = new_state;
        }

        self.storage.save(LOCATION_KEY, &content)
    }

    /// Reset to the empty selection
    pub fn clear(&self) -> Result<(), AppError> {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = SelectionState::default();
        }
        self.storage.remove(LOCATION_KEY)
    }
}
