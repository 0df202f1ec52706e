use std::env;

use tracing::warn;

/// Pipeline configuration loaded from environment variables.
///
/// Source credentials are all optional: a missing key disables that adapter
/// for the run (logged as a warning) rather than failing the run. A run
/// where no source has credentials is rejected by the orchestrator as a
/// configuration error.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Postgres catalog. Optional — the in-memory catalog needs no URL.
    pub database_url: Option<String>,

    /// Places-style API key (GOOGLE_PLACES_API_KEY).
    pub places_api_key: Option<String>,

    /// Reviews-style API key (YELP_API_KEY).
    pub reviews_api_key: Option<String>,

    /// Base search URL for the keyless directory scraper
    /// (DIRECTORY_SEARCH_URL). Unset disables that adapter too.
    pub directory_search_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let config = Self {
            database_url: optional_env("DATABASE_URL"),
            places_api_key: optional_env("GOOGLE_PLACES_API_KEY"),
            reviews_api_key: optional_env("YELP_API_KEY"),
            directory_search_url: optional_env("DIRECTORY_SEARCH_URL"),
        };

        if config.places_api_key.is_none() {
            warn!("GOOGLE_PLACES_API_KEY not set, places adapter disabled");
        }
        if config.reviews_api_key.is_none() {
            warn!("YELP_API_KEY not set, reviews adapter disabled");
        }
        if config.directory_search_url.is_none() {
            warn!("DIRECTORY_SEARCH_URL not set, directory adapter disabled");
        }

        config
    }

    /// True if at least one source is configured for this run.
    pub fn any_source(&self) -> bool {
        self.places_api_key.is_some()
            || self.reviews_api_key.is_some()
            || self.directory_search_url.is_some()
    }

    /// Log which credentials are present without printing their values.
    pub fn log_redacted(&self) {
        tracing::info!(
            database = self.database_url.is_some(),
            places = self.places_api_key.is_some(),
            reviews = self.reviews_api_key.is_some(),
            directory = self.directory_search_url.is_some(),
            "Config loaded"
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
