//! Places-style text-search API adapter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use votewallet_common::{HarvestError, RawBusiness};

use crate::processor;
use crate::rate_limit::RateLimiter;

use super::{in_requested_city, SourceAdapter};

const SOURCE_ID: &str = "places";
const SEARCH_URL: &str = "https://maps.googleapis.com/maps/api/place/textsearch/json";
/// Each continuation page costs a billed request; three pages (~60 results)
/// is plenty per combination.
const MAX_PAGES: u32 = 3;

pub struct PlacesAdapter {
    api_key: String,
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<PlaceResult>,
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    #[serde(default)]
    name: String,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    user_ratings_total: Option<u32>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    formatted_phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl PlacesAdapter {
    pub fn new(api_key: &str, limiter: Arc<RateLimiter>) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            limiter,
        }
    }

    async fn fetch_page(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<SearchResponse, HarvestError> {
        self.limiter.acquire(SOURCE_ID).await;

        let mut request = self
            .client
            .get(SEARCH_URL)
            .query(&[("query", query), ("key", &self.api_key)]);
        if let Some(token) = page_token {
            request = request.query(&[("pagetoken", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HarvestError::source(SOURCE_ID, format!("request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(HarvestError::RateLimited {
                source_id: SOURCE_ID.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(HarvestError::source(
                SOURCE_ID,
                format!("HTTP {}", response.status()),
            ));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| HarvestError::source(SOURCE_ID, format!("parse failed: {e}")))?;

        match body.status.as_str() {
            "OK" | "ZERO_RESULTS" | "" => Ok(body),
            "OVER_QUERY_LIMIT" => Err(HarvestError::RateLimited {
                source_id: SOURCE_ID.to_string(),
            }),
            "REQUEST_DENIED" | "INVALID_REQUEST" => Err(HarvestError::source_permanent(
                SOURCE_ID,
                format!("API rejected request: {}", body.status),
            )),
            other => Err(HarvestError::source(
                SOURCE_ID,
                format!("unexpected status: {other}"),
            )),
        }
    }

    fn to_raw(&self, result: PlaceResult, city: &str, industry: &str) -> RawBusiness {
        let location = result.geometry.and_then(|g| g.location);
        RawBusiness {
            name: Some(result.name),
            category: Some(industry.to_string()),
            address: result.formatted_address.clone(),
            city: Some(city.to_string()),
            state: result
                .formatted_address
                .as_deref()
                .and_then(state_from_address),
            phone: result.formatted_phone_number,
            website: result.website,
            latitude: location.as_ref().map(|l| l.lat),
            longitude: location.as_ref().map(|l| l.lng),
            rating: result.rating,
            review_count: result.user_ratings_total,
            source: SOURCE_ID.to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SourceAdapter for PlacesAdapter {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    async fn fetch_candidates(
        &self,
        city: &str,
        industry: &str,
    ) -> Result<Vec<RawBusiness>, HarvestError> {
        let query = format!("{industry} in {city}");
        info!(city, industry, source = SOURCE_ID, "Fetching candidates");

        let mut candidates = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 0..MAX_PAGES {
            let body = self.fetch_page(&query, page_token.as_deref()).await?;
            let page_size = body.results.len();

            for result in body.results {
                if !in_requested_city(city, None, result.formatted_address.as_deref()) {
                    continue;
                }
                candidates.push(self.to_raw(result, city, industry));
            }

            match body.next_page_token {
                Some(token) if page + 1 < MAX_PAGES => page_token = Some(token),
                _ => break,
            }
            if page_size == 0 {
                break;
            }
        }

        if candidates.is_empty() {
            warn!(city, industry, source = SOURCE_ID, "No in-city candidates");
        }
        Ok(candidates)
    }
}

/// Pull a two-letter state code out of a formatted US address, e.g.
/// "1 Main St, Des Moines, IA 50309, United States".
fn state_from_address(address: &str) -> Option<String> {
    address
        .split(',')
        .map(str::trim)
        .filter_map(|part| {
            let token = part.split_whitespace().next()?;
            (token.len() == 2 && token.chars().all(|c| c.is_ascii_uppercase()))
                .then(|| processor::normalize_state(token))
        })
        .next()
}
