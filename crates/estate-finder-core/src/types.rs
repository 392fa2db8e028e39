// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which level of the location hierarchy a candidate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    City,
    Area,
    Locality,
}

impl CandidateKind {
    /// Parse a kind from user input ("city", "areas", "Locality", ...)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().trim_end_matches('s') {
            "city" | "citie" => Some(Self::City),
            "area" => Some(Self::Area),
            "locality" | "localitie" => Some(Self::Locality),
            _ => None,
        }
    }

    /// Get display label for this kind
    pub fn label(&self) -> &'static str {
        match self {
            Self::City => "City",
            Self::Area => "Area",
            Self::Locality => "Locality",
        }
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A city, area or locality record returned by a listing or search call.
///
/// Candidates are never mutated after they are received; the search
/// component only reorders and filters them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: i64,
    pub name: String,
    /// City the record belongs to, used for client-side city filtering
    pub city_name: String,
    /// Parent area, when the record is a locality
    #[serde(default)]
    pub area_name: Option<String>,
    pub kind: CandidateKind,
}

impl Candidate {
    pub fn new(
        kind: CandidateKind,
        id: i64,
        name: impl Into<String>,
        city_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            city_name: city_name.into(),
            area_name: None,
            kind,
        }
    }

    pub fn with_area(mut self, area_name: impl Into<String>) -> Self {
        self.area_name = Some(area_name.into());
        self
    }
}

/// Parameters of one remote search, built when input settles
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationQuery {
    pub name: String,
    pub city_id: Option<i64>,
}

impl LocationQuery {
    pub fn new(name: impl Into<String>, city_id: Option<i64>) -> Self {
        Self {
            name: name.into(),
            city_id,
        }
    }
}

/// The user's current city/area/locality choice.
///
/// Always replaced as a whole; `display_name` is derived from the other
/// fields by the constructors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionState {
    pub city_id: Option<i64>,
    pub city_name: String,
    pub area_id: Option<i64>,
    pub area_name: String,
    pub locality_name: String,
    pub display_name: String,
    pub selected_at: Option<DateTime<Utc>>,
}

impl SelectionState {
    /// Start a selection at the city level
    pub fn city(city_id: i64, city_name: impl Into<String>) -> Self {
        let mut state = Self {
            city_id: Some(city_id),
            city_name: city_name.into(),
            selected_at: Some(Utc::now()),
            ..Self::default()
        };
        state.display_name = state.compose_display_name();
        state
    }

    /// Narrow the selection to an area of the chosen city
    pub fn with_area(mut self, area_id: i64, area_name: impl Into<String>) -> Self {
        self.area_id = Some(area_id);
        self.area_name = area_name.into();
        self.display_name = self.compose_display_name();
        self
    }

    /// Narrow the selection to a locality
    pub fn with_locality(mut self, locality_name: impl Into<String>) -> Self {
        self.locality_name = locality_name.into();
        self.display_name = self.compose_display_name();
        self
    }

    /// Whether nothing has been selected yet
    pub fn is_empty(&self) -> bool {
        self.city_id.is_none()
    }

    /// Selection after the user picks `candidate` on top of this one.
    ///
    /// Picking a city starts over; areas and localities need a city first.
    pub fn narrowed(&self, candidate: &Candidate) -> Result<SelectionState, AppError> {
        if candidate.kind == CandidateKind::City {
            return Ok(Self::city(candidate.id, candidate.name.clone()));
        }

        let city_id = self.city_id.ok_or_else(|| {
            AppError::NotFound(format!("No city selected for {}", candidate.name))
        })?;
        let base = Self::city(city_id, self.city_name.clone());

        Ok(match candidate.kind {
            CandidateKind::Area => base.with_area(candidate.id, candidate.name.clone()),
            _ => match self.area_id {
                Some(area_id) => base
                    .with_area(area_id, self.area_name.clone())
                    .with_locality(candidate.name.clone()),
                None => base.with_locality(candidate.name.clone()),
            },
        })
    }

    /// Same place, ignoring when it was chosen
    pub fn same_place(&self, other: &SelectionState) -> bool {
        self.city_id == other.city_id
            && self.area_id == other.area_id
            && self.locality_name == other.locality_name
    }

    fn compose_display_name(&self) -> String {
        [&self.locality_name, &self.area_name, &self.city_name]
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Application settings (frontend-agnostic)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Base URL of the listings API, without trailing slash
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Pause in typing before a remote search is sent
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Connect timeout for API requests in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// How many recent selections to remember
    #[serde(default = "default_max_recent_locations")]
    pub max_recent_locations: usize,
}

fn default_api_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_max_recent_locations() -> usize {
    10
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            debounce_ms: default_debounce_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_recent_locations: default_max_recent_locations(),
        }
    }
}

impl AppSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Reject settings that cannot drive a client
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(AppError::InvalidConfig(format!(
                "API base URL must be http(s): {}",
                self.api_base_url
            )));
        }
        if self.max_recent_locations == 0 {
            return Err(AppError::InvalidConfig(
                "maxRecentLocations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-run adjustments that are applied on top of stored settings but
/// never written back
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub api_base_url: Option<String>,
    pub debounce_ms: Option<u64>,
}

impl SettingsOverrides {
    pub fn apply(&self, mut settings: AppSettings) -> AppSettings {
        if let Some(url) = &self.api_base_url {
            settings.api_base_url = url.clone();
        }
        if let Some(debounce_ms) = self.debounce_ms {
            settings.debounce_ms = debounce_ms;
        }
        settings
    }
}

/// Error types for the application
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("File I/O error: {0}")]
    FileIo(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileIo(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Serialization(err.to_string())
        } else if let Some(status) = err.status() {
            AppError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            AppError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.debounce_ms, 300);
        assert_eq!(settings.debounce(), Duration::from_millis(300));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_missing_fields_take_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"apiBaseUrl":"https://example.test"}"#).unwrap();
        assert_eq!(settings.api_base_url, "https://example.test");
        assert_eq!(settings.max_recent_locations, 10);
    }

    #[test]
    fn test_invalid_base_url() {
        let settings = AppSettings {
            api_base_url: "ftp://nope".to_string(),
            ..AppSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(AppError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_selection_display_name() {
        let state = SelectionState::city(3, "Delhi")
            .with_area(12, "Dwarka")
            .with_locality("Sector 7");
        assert_eq!(state.display_name, "Sector 7, Dwarka, Delhi");

        let city_only = SelectionState::city(3, "Delhi");
        assert_eq!(city_only.display_name, "Delhi");
        assert!(!city_only.is_empty());
        assert!(SelectionState::default().is_empty());
    }

    #[test]
    fn test_selection_serializes_snake_case() {
        let state = SelectionState::city(3, "Delhi").with_area(12, "Dwarka");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["city_id"], 3);
        assert_eq!(json["area_name"], "Dwarka");
    }

    #[test]
    fn test_narrowed_selection() {
        let none = SelectionState::default();
        let area = Candidate::new(CandidateKind::Area, 12, "Dwarka", "Delhi");
        assert!(matches!(none.narrowed(&area), Err(AppError::NotFound(_))));

        let city = none
            .narrowed(&Candidate::new(CandidateKind::City, 3, "Delhi", "Delhi"))
            .unwrap();
        let with_area = city.narrowed(&area).unwrap();
        assert_eq!(with_area.area_id, Some(12));

        let locality = Candidate::new(CandidateKind::Locality, 40, "Sector 7", "Delhi");
        let full = with_area.narrowed(&locality).unwrap();
        assert_eq!(full.display_name, "Sector 7, Dwarka, Delhi");

        // Picking another city drops area and locality
        let jaipur = full
            .narrowed(&Candidate::new(CandidateKind::City, 7, "Jaipur", "Jaipur"))
            .unwrap();
        assert_eq!(jaipur.display_name, "Jaipur");
        assert_eq!(jaipur.area_id, None);
    }

    #[test]
    fn test_overrides_apply_without_touching_rest() {
        let overrides = SettingsOverrides {
            debounce_ms: Some(50),
            ..SettingsOverrides::default()
        };
        let settings = overrides.apply(AppSettings::default());
        assert_eq!(settings.debounce_ms, 50);
        assert_eq!(settings.api_base_url, AppSettings::default().api_base_url);
    }

    #[test]
    fn test_kind_from_name() {
        assert_eq!(CandidateKind::from_name("Areas"), Some(CandidateKind::Area));
        assert_eq!(
            CandidateKind::from_name("localities"),
            Some(CandidateKind::Locality)
        );
        assert_eq!(CandidateKind::from_name("cities"), Some(CandidateKind::City));
        assert_eq!(CandidateKind::from_name("street"), None);
    }
}
