//! Reviews-style business-search API adapter (Yelp Fusion shape).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use votewallet_common::{HarvestError, RawBusiness};

use crate::rate_limit::RateLimiter;

use super::{in_requested_city, SourceAdapter};

const SOURCE_ID: &str = "reviews";
const SEARCH_URL: &str = "https://api.yelp.com/v3/businesses/search";
const PAGE_SIZE: u32 = 50;
/// Offset-paginated; the API refuses offsets past 1000, and three pages per
/// combination is enough volume.
const MAX_PAGES: u32 = 3;

pub struct ReviewsAdapter {
    api_key: String,
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    businesses: Vec<BusinessResult>,
    #[serde(default)]
    total: u32,
}

#[derive(Debug, Deserialize)]
struct BusinessResult {
    #[serde(default)]
    name: String,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default)]
    coordinates: Option<Coordinates>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    review_count: Option<u32>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct Location {
    #[serde(default)]
    address1: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    zip_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl ReviewsAdapter {
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
        city: &str,
        industry: &str,
        offset: u32,
    ) -> Result<SearchResponse, HarvestError> {
        self.limiter.acquire(SOURCE_ID).await;

        let response = self
            .client
            .get(SEARCH_URL)
            .bearer_auth(&self.api_key)
            .query(&[
                ("location", city),
                ("term", industry),
                ("limit", &PAGE_SIZE.to_string()),
                ("offset", &offset.to_string()),
            ])
            .send()
            .await
            .map_err(|e| HarvestError::source(SOURCE_ID, format!("request failed: {e}")))?;

        match response.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => Err(HarvestError::RateLimited {
                source_id: SOURCE_ID.to_string(),
            }),
            status if status.is_client_error() => Err(HarvestError::source_permanent(
                SOURCE_ID,
                format!("HTTP {status}"),
            )),
            status if !status.is_success() => {
                Err(HarvestError::source(SOURCE_ID, format!("HTTP {status}")))
            }
            _ => response
                .json()
                .await
                .map_err(|e| HarvestError::source(SOURCE_ID, format!("parse failed: {e}"))),
        }
    }

    fn to_raw(&self, result: BusinessResult, industry: &str) -> RawBusiness {
        let location = result.location;
        let coordinates = result.coordinates;
        let category = result
            .categories
            .first()
            .map(|c| c.title.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| industry.to_string());
        RawBusiness {
            name: Some(result.name),
            category: Some(category),
            address: location.as_ref().and_then(|l| l.address1.clone()),
            city: location.as_ref().and_then(|l| l.city.clone()),
            state: location.as_ref().and_then(|l| l.state.clone()),
            zip_code: location.as_ref().and_then(|l| l.zip_code.clone()),
            phone: result.phone,
            website: result.url,
            latitude: coordinates.as_ref().and_then(|c| c.latitude),
            longitude: coordinates.as_ref().and_then(|c| c.longitude),
            rating: result.rating,
            review_count: result.review_count,
            image_url: result.image_url,
            source: SOURCE_ID.to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SourceAdapter for ReviewsAdapter {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    async fn fetch_candidates(
        &self,
        city: &str,
        industry: &str,
    ) -> Result<Vec<RawBusiness>, HarvestError> {
        info!(city, industry, source = SOURCE_ID, "Fetching candidates");

        let mut candidates = Vec::new();
        for page in 0..MAX_PAGES {
            let offset = page * PAGE_SIZE;
            let body = self.fetch_page(city, industry, offset).await?;
            let page_count = body.businesses.len() as u32;

            for result in body.businesses {
                let candidate_city = result.location.as_ref().and_then(|l| l.city.as_deref());
                let address = result.location.as_ref().and_then(|l| l.address1.as_deref());
                if !in_requested_city(city, candidate_city, address) {
                    continue;
                }
                candidates.push(self.to_raw(result, industry));
            }

            if offset + page_count >= body.total || page_count == 0 {
                break;
            }
        }

        Ok(candidates)
    }
}
