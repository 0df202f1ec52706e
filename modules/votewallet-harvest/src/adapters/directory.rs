//! Keyless directory scraper.
//!
//! Two-step source: a search page query yields candidate business-profile
//! links, then each candidate's page is fetched for detail. Both steps go
//! through the shared rate limiter.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{info, warn};

use votewallet_common::{HarvestError, RawBusiness};

use crate::rate_limit::RateLimiter;

use super::{CandidateRef, SourceAdapter};

const SOURCE_ID: &str = "directory";
/// Detail fetches are the expensive step; cap candidates per combination.
const MAX_CANDIDATES: usize = 12;

pub struct DirectoryAdapter {
    search_base: String,
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
}

impl DirectoryAdapter {
    pub fn new(search_base: &str, limiter: Arc<RateLimiter>) -> Self {
        Self {
            search_base: search_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent("votewallet-harvest/0.1")
                .build()
                .expect("Failed to build HTTP client"),
            limiter,
        }
    }

    fn search_url(&self, query: &str) -> Result<url::Url, HarvestError> {
        let mut url = url::Url::parse(&self.search_base).map_err(|e| {
            HarvestError::source_permanent(SOURCE_ID, format!("bad search base URL: {e}"))
        })?;
        url.query_pairs_mut().append_pair("q", query);
        Ok(url)
    }

    async fn fetch_html(&self, url: &str) -> Result<String, HarvestError> {
        self.limiter.acquire(SOURCE_ID).await;

        let response = self
            .client
            .get(url)
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

        response
            .text()
            .await
            .map_err(|e| HarvestError::source(SOURCE_ID, format!("read failed: {e}")))
    }
}

#[async_trait]
impl SourceAdapter for DirectoryAdapter {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    async fn fetch_candidates(
        &self,
        city: &str,
        industry: &str,
    ) -> Result<Vec<RawBusiness>, HarvestError> {
        let query = format!("{industry} {city}");
        let search_url = self.search_url(&query)?;
        info!(city, industry, source = SOURCE_ID, "Searching directory");

        let html = self.fetch_html(search_url.as_str()).await?;
        let links = extract_links(&html, &self.search_base, "/biz/");

        let mut candidates = Vec::new();
        for link in links.into_iter().take(MAX_CANDIDATES) {
            let candidate = CandidateRef {
                source_id: SOURCE_ID.to_string(),
                reference: link,
            };
            match self.fetch_detail(&candidate).await {
                Ok(mut raw) => {
                    // The search page carries no address; trust the query
                    // geography for city/industry and let validation judge
                    // the rest.
                    raw.city = Some(city.to_string());
                    raw.category = Some(industry.to_string());
                    candidates.push(raw);
                }
                Err(e) => {
                    warn!(reference = candidate.reference.as_str(), error = %e, "Detail fetch failed, skipping candidate");
                }
            }
        }
        Ok(candidates)
    }

    async fn fetch_detail(&self, candidate: &CandidateRef) -> Result<RawBusiness, HarvestError> {
        let html = self.fetch_html(&candidate.reference).await?;
        let mut raw = parse_profile(&html);
        raw.website = Some(candidate.reference.clone());
        raw.source = SOURCE_ID.to_string();
        Ok(raw)
    }
}

/// Extract profile links matching `pattern` from raw HTML, resolving
/// relative hrefs against `base_url`. Deduplicated, capped at 20.
fn extract_links(html: &str, base_url: &str, pattern: &str) -> Vec<String> {
    let href_re = Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).expect("valid regex");
    let base = url::Url::parse(base_url).ok();

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for cap in href_re.captures_iter(html) {
        let raw = &cap[1];

        let resolved = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else if let Some(ref b) = base {
            match b.join(raw) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            }
        } else {
            continue;
        };

        if resolved.contains(pattern) && seen.insert(resolved.clone()) {
            links.push(resolved);
            if links.len() >= 20 {
                break;
            }
        }
    }

    links
}

/// Best-effort extraction from a business profile page: the page title as
/// the name, plus the first phone-shaped and email-shaped strings.
fn parse_profile(html: &str) -> RawBusiness {
    let title_re = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex");
    let phone_re =
        Regex::new(r"\(?\d{3}\)?[\s.-]\d{3}[\s.-]\d{4}").expect("valid regex");
    let email_re =
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid regex");

    let name = title_re
        .captures(html)
        .map(|c| strip_title_suffix(c[1].trim()))
        .filter(|n| !n.is_empty());

    RawBusiness {
        name,
        phone: phone_re.find(html).map(|m| m.as_str().to_string()),
        email: email_re.find(html).map(|m| m.as_str().to_string()),
        ..Default::default()
    }
}

/// Titles usually read "Business Name | Directory" or "Business Name - City".
fn strip_title_suffix(title: &str) -> String {
    title
        .split(['|', '-'])
        .next()
        .unwrap_or(title)
        .trim()
        .to_string()
}
