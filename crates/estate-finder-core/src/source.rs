// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Candidate sources
//
// A source supplies the preloaded local list and the remote search for
// one selection flow (city, area or locality).

use crate::api::LocationService;
use crate::types::{AppError, Candidate, CandidateKind, LocationQuery};
use async_trait::async_trait;
use std::sync::Arc;

/// Where the search component gets its candidates from
#[async_trait]
pub trait CandidateSource: Send + Sync {
    fn kind(&self) -> CandidateKind;

    /// City remote results are restricted to, if any
    fn city_filter(&self) -> Option<&str> {
        None
    }

    /// City id sent with remote searches, if any
    fn city_id(&self) -> Option<i64> {
        None
    }

    /// Whether `search` can return anything beyond the local list
    fn has_remote_search(&self) -> bool {
        true
    }

    /// Full list filtered locally as the user types
    async fn load(&self) -> Result<Vec<Candidate>, AppError>;

    /// Remote name search for a settled query
    async fn search(&self, query: &LocationQuery) -> Result<Vec<Candidate>, AppError>;
}

/// Cities; there is no remote city search, so only the local list is used
pub struct CitySource {
    service: Arc<dyn LocationService>,
}

impl CitySource {
    pub fn new(service: Arc<dyn LocationService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CandidateSource for CitySource {
    fn kind(&self) -> CandidateKind {
        CandidateKind::City
    }

    fn has_remote_search(&self) -> bool {
        false
    }

    async fn load(&self) -> Result<Vec<Candidate>, AppError> {
        self.service.cities().await
    }

    async fn search(&self, _query: &LocationQuery) -> Result<Vec<Candidate>, AppError> {
        Ok(Vec::new())
    }
}

/// Areas of one city
pub struct AreaSource {
    service: Arc<dyn LocationService>,
    city_id: i64,
    city_name: String,
}

impl AreaSource {
    pub fn new(service: Arc<dyn LocationService>, city_id: i64, city_name: impl Into<String>) -> Self {
        Self {
            service,
            city_id,
            city_name: city_name.into(),
        }
    }
}

#[async_trait]
impl CandidateSource for AreaSource {
    fn kind(&self) -> CandidateKind {
        CandidateKind::Area
    }

    fn city_filter(&self) -> Option<&str> {
        Some(self.city_name.as_str())
    }

    fn city_id(&self) -> Option<i64> {
        Some(self.city_id)
    }

    async fn load(&self) -> Result<Vec<Candidate>, AppError> {
        let areas = self.service.areas(self.city_id).await?;
        Ok(with_city(areas, &self.city_name))
    }

    async fn search(&self, query: &LocationQuery) -> Result<Vec<Candidate>, AppError> {
        self.service
            .search_localities(query, CandidateKind::Area)
            .await
    }
}

/// Localities of one city, optionally within one area
pub struct LocalitySource {
    service: Arc<dyn LocationService>,
    city_id: i64,
    city_name: String,
    area_id: Option<i64>,
}

impl LocalitySource {
    pub fn new(service: Arc<dyn LocationService>, city_id: i64, city_name: impl Into<String>) -> Self {
        Self {
            service,
            city_id,
            city_name: city_name.into(),
            area_id: None,
        }
    }

    pub fn within_area(mut self, area_id: i64) -> Self {
        self.area_id = Some(area_id);
        self
    }
}

#[async_trait]
impl CandidateSource for LocalitySource {
    fn kind(&self) -> CandidateKind {
        CandidateKind::Locality
    }

    fn city_filter(&self) -> Option<&str> {
        Some(self.city_name.as_str())
    }

    fn city_id(&self) -> Option<i64> {
        Some(self.city_id)
    }

    async fn load(&self) -> Result<Vec<Candidate>, AppError> {
        let localities = self.service.localities(self.city_id, self.area_id).await?;
        Ok(with_city(localities, &self.city_name))
    }

    async fn search(&self, query: &LocationQuery) -> Result<Vec<Candidate>, AppError> {
        self.service
            .search_localities(query, CandidateKind::Locality)
            .await
    }
}

/// Listings are keyed by city, so records missing a city belong to it
fn with_city(candidates: Vec<Candidate>, city_name: &str) -> Vec<Candidate> {
    candidates
        .into_iter()
        .map(|mut candidate| {
            if candidate.city_name.is_empty() {
                candidate.city_name = city_name.to_string();
            }
            candidate
        })
        .collect()
}
