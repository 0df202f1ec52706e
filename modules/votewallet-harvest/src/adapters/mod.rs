//! Source adapters.
//!
//! One adapter per external data source. Each owns its request construction,
//! auth, pagination, and response parsing, and acquires the shared rate
//! limiter before every network fetch — including continuation pages. The
//! orchestrator treats adapters polymorphically; the only source-specific
//! decision it makes is which adapters to construct at startup.

pub mod directory;
pub mod places;
pub mod reviews;

use std::sync::Arc;

use async_trait::async_trait;

use votewallet_common::{Config, HarvestError, RawBusiness};

use crate::rate_limit::RateLimiter;

/// Opaque handle to a search candidate, for sources that separate search
/// from detail retrieval.
#[derive(Debug, Clone)]
pub struct CandidateRef {
    pub source_id: String,
    pub reference: String,
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> &'static str;

    /// Turn a (city, industry) query into zero or more raw business records.
    /// Candidates outside the requested geography are silently dropped, not
    /// errored.
    async fn fetch_candidates(
        &self,
        city: &str,
        industry: &str,
    ) -> Result<Vec<RawBusiness>, HarvestError>;

    /// Fetch full detail for one candidate. Single-step sources don't
    /// support this.
    async fn fetch_detail(&self, candidate: &CandidateRef) -> Result<RawBusiness, HarvestError> {
        let _ = candidate;
        Err(HarvestError::source_permanent(
            self.id(),
            "detail retrieval not supported",
        ))
    }
}

/// Construct every adapter the current configuration has credentials for.
pub fn adapters_from_config(
    config: &Config,
    limiter: Arc<RateLimiter>,
) -> Vec<Arc<dyn SourceAdapter>> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();
    if let Some(key) = &config.places_api_key {
        adapters.push(Arc::new(places::PlacesAdapter::new(key, limiter.clone())));
    }
    if let Some(key) = &config.reviews_api_key {
        adapters.push(Arc::new(reviews::ReviewsAdapter::new(key, limiter.clone())));
    }
    if let Some(base) = &config.directory_search_url {
        adapters.push(Arc::new(directory::DirectoryAdapter::new(base, limiter)));
    }
    adapters
}

/// True when a candidate's address or city field places it in the requested
/// city. Sources routinely pad thin result sets with nearby towns; those are
/// dropped rather than surfaced as errors.
pub(crate) fn in_requested_city(
    requested_city: &str,
    candidate_city: Option<&str>,
    address: Option<&str>,
) -> bool {
    let wanted = requested_city.to_lowercase();
    if let Some(city) = candidate_city {
        return city.to_lowercase() == wanted;
    }
    if let Some(address) = address {
        return address.to_lowercase().contains(&wanted);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_field_takes_precedence() {
        assert!(in_requested_city("Des Moines", Some("des moines"), None));
        assert!(!in_requested_city(
            "Des Moines",
            Some("West Des Moines"),
            Some("1 Main St, Des Moines, IA")
        ));
    }

    #[test]
    fn address_is_the_fallback_signal() {
        assert!(in_requested_city(
            "Des Moines",
            None,
            Some("1 Main St, Des Moines, IA 50309")
        ));
        assert!(!in_requested_city("Des Moines", None, Some("9 Elm St, Ames, IA")));
    }

    #[test]
    fn no_geography_signal_means_drop() {
        assert!(!in_requested_city("Des Moines", None, None));
    }

    #[test]
    fn no_credentials_means_no_adapters() {
        let limiter = Arc::new(RateLimiter::new(std::time::Duration::from_millis(1)));
        let adapters = adapters_from_config(&Config::default(), limiter);
        assert!(adapters.is_empty());
    }

    #[test]
    fn each_configured_source_yields_one_adapter() {
        let config = Config {
            database_url: None,
            places_api_key: Some("k1".to_string()),
            reviews_api_key: Some("k2".to_string()),
            directory_search_url: Some("https://search.example.com/html".to_string()),
        };
        let limiter = Arc::new(RateLimiter::new(std::time::Duration::from_millis(1)));
        let adapters = adapters_from_config(&config, limiter);
        let ids: Vec<_> = adapters.iter().map(|a| a.id()).collect();
        assert_eq!(ids, vec!["places", "reviews", "directory"]);
    }
}
