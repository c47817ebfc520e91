//! Nominatim (OpenStreetMap) geocoding.

use axum::{
    extract::{Query, State},
    Json,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;

const USER_AGENT: &str = "Buzz2Remote/0.1 (remote job board)";

/// Locations that mean "anywhere" and are never sent to the geocoder.
const REMOTE_MARKERS: &[&str] = &["remote", "anywhere", "worldwide", "global", "work from home"];

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    lat: String,
    lon: String,
    display_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeocodedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

#[derive(Clone)]
pub struct Geocoder {
    client: Client,
    base_url: String,
}

impl Geocoder {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Looks up a free-form place. `Ok(None)` when nothing matches.
    #[instrument(skip(self))]
    pub async fn geocode(&self, query: &str) -> Result<Option<GeocodedLocation>, AppError> {
        let url = format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url,
            urlencoding::encode(query.trim())
        );
        debug!("Geocoding location: {query}");

        let results: Vec<NominatimResponse> = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Upstream(format!("Geocoding request failed: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Geocoding response malformed: {e}")))?;

        results.into_iter().next().map(parse_result).transpose()
    }

    /// Geocodes unless the location is a remote marker; failures are logged
    /// and yield `None`.
    pub async fn geocode_best_effort(&self, location: &str) -> Option<GeocodedLocation> {
        if is_remote_location(location) {
            return None;
        }
        match self.geocode(location).await {
            Ok(found) => found,
            Err(e) => {
                warn!(location, "Geocoding skipped: {e}");
                None
            }
        }
    }
}

fn parse_result(result: NominatimResponse) -> Result<GeocodedLocation, AppError> {
    let latitude = result
        .lat
        .parse::<f64>()
        .map_err(|e| AppError::Upstream(format!("Invalid latitude in response: {e}")))?;
    let longitude = result
        .lon
        .parse::<f64>()
        .map_err(|e| AppError::Upstream(format!("Invalid longitude in response: {e}")))?;
    Ok(GeocodedLocation {
        latitude,
        longitude,
        display_name: result.display_name,
    })
}

pub fn is_remote_location(location: &str) -> bool {
    let lower = location.trim().to_lowercase();
    if lower.is_empty() {
        return true;
    }
    REMOTE_MARKERS.iter().any(|m| match lower.strip_prefix(*m) {
        Some(rest) => rest.is_empty() || rest.starts_with(' ') || rest.starts_with('('),
        None => false,
    })
}

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub q: String,
}

/// GET /api/v1/geocode
pub async fn handle_geocode(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> Result<Json<GeocodedLocation>, AppError> {
    if query.q.trim().len() < 2 {
        return Err(AppError::Validation(
            "q must be at least 2 characters".to_string(),
        ));
    }
    state
        .geocoder
        .geocode(&query.q)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Location not found: {}", query.q.trim())))
}
