// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Location API client
//
// Thin wrappers over the listing and search endpoints. Response shapes
// vary between endpoints, so records are read field by field and missing
// values are defaulted instead of failing the whole list.

use crate::types::{AppError, AppSettings, Candidate, CandidateKind, LocationQuery};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};

/// Remote location endpoints
#[async_trait]
pub trait LocationService: Send + Sync {
    /// All cities served by the backend
    async fn cities(&self) -> Result<Vec<Candidate>, AppError>;

    /// All areas of a city
    async fn areas(&self, city_id: i64) -> Result<Vec<Candidate>, AppError>;

    /// All localities of a city, optionally restricted to one area
    async fn localities(
        &self,
        city_id: i64,
        area_id: Option<i64>,
    ) -> Result<Vec<Candidate>, AppError>;

    /// Name search; records are read as `kind`
    async fn search_localities(
        &self,
        query: &LocationQuery,
        kind: CandidateKind,
    ) -> Result<Vec<Candidate>, AppError>;
}

/// HTTP implementation of [`LocationService`]
pub struct LocationApi {
    http_client: Client,
    base_url: String,
}

impl LocationApi {
    pub fn new(settings: &AppSettings) -> Result<Self, AppError> {
        settings.validate()?;

        // Only a connect timeout; searches wait as long as the transport allows
        let http_client = Client::builder()
            .connect_timeout(settings.connect_timeout())
            .build()
            .map_err(|e| AppError::InvalidConfig(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, AppError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    AppError::Network(format!("Cannot connect to {} - {}", self.base_url, e))
                } else {
                    AppError::Network(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Serialization(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl LocationService for LocationApi {
    async fn cities(&self) -> Result<Vec<Candidate>, AppError> {
        let body = self.get_json("/cities", &[]).await?;
        parse_candidates(&body, CandidateKind::City)
    }

    async fn areas(&self, city_id: i64) -> Result<Vec<Candidate>, AppError> {
        let body = self
            .get_json("/areas", &[("city_id", city_id.to_string())])
            .await?;
        parse_candidates(&body, CandidateKind::Area)
    }

    async fn localities(
        &self,
        city_id: i64,
        area_id: Option<i64>,
    ) -> Result<Vec<Candidate>, AppError> {
        let mut params = vec![("city_id", city_id.to_string())];
        if let Some(area_id) = area_id {
            params.push(("area_id", area_id.to_string()));
        }
        let body = self.get_json("/localities", &params).await?;
        parse_candidates(&body, CandidateKind::Locality)
    }

    async fn search_localities(
        &self,
        query: &LocationQuery,
        kind: CandidateKind,
    ) -> Result<Vec<Candidate>, AppError> {
        let mut params = vec![("name", query.name.clone())];
        if let Some(city_id) = query.city_id {
            params.push(("city_id", city_id.to_string()));
        }
        let body = self.get_json("/localities/search", &params).await?;
        parse_candidates(&body, kind)
    }
}

/// Extract the record list from a response body.
///
/// Accepts a bare array or an object carrying the list under `data`,
/// `formattedData` or `results`. Records without a usable id are skipped.
pub fn parse_candidates(body: &Value, kind: CandidateKind) -> Result<Vec<Candidate>, AppError> {
    let records = match body {
        Value::Array(items) => items,
        Value::Object(obj) => ["data", "formattedData", "results"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_array))
            .ok_or_else(|| {
                AppError::Serialization("Response has no candidate list".to_string())
            })?,
        _ => {
            return Err(AppError::Serialization(
                "Unexpected response shape".to_string(),
            ))
        }
    };

    let mut candidates = Vec::with_capacity(records.len());
    for record in records {
        match record.as_object().and_then(|obj| read_candidate(obj, kind)) {
            Some(candidate) => candidates.push(candidate),
            None => tracing::warn!("Skipping {} record without id: {}", kind, record),
        }
    }
    Ok(candidates)
}

fn read_candidate(obj: &Map<String, Value>, kind: CandidateKind) -> Option<Candidate> {
    let (id_keys, name_keys): (&[&str], &[&str]) = match kind {
        CandidateKind::City => (&["id", "city_id"][..], &["city_name", "name"][..]),
        CandidateKind::Area => (&["id", "area_id"][..], &["area_name", "name"][..]),
        CandidateKind::Locality => (
            &["id", "locality_id"][..],
            &["locality_name", "name", "area_name"][..],
        ),
    };

    let id = id_keys.iter().find_map(|key| obj.get(*key).and_then(as_id))?;
    let name = name_keys
        .iter()
        .find_map(|key| obj.get(*key).and_then(as_text))
        .unwrap_or_else(|| "Unknown".to_string());

    let city_name = if kind == CandidateKind::City {
        name.clone()
    } else {
        obj.get("city_name").and_then(as_text).unwrap_or_default()
    };

    let area_name = match kind {
        CandidateKind::Locality => obj.get("area_name").and_then(as_text),
        _ => None,
    };

    Some(Candidate {
        id,
        name,
        city_name,
        area_name,
        kind,
    })
}

fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
