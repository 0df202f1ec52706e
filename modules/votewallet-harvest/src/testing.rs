//! Test doubles for the source-adapter seam.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use votewallet_common::{HarvestError, RawBusiness};

use crate::adapters::SourceAdapter;

/// Returns the same canned candidates for every (city, industry) query.
pub struct StubAdapter {
    id: &'static str,
    candidates: Vec<RawBusiness>,
    pub calls: AtomicU32,
}

impl StubAdapter {
    pub fn new(id: &'static str, candidates: Vec<RawBusiness>) -> Self {
        Self {
            id,
            candidates,
            calls: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn id(&self) -> &'static str {
        self.id
    }

    async fn fetch_candidates(
        &self,
        _city: &str,
        _industry: &str,
    ) -> Result<Vec<RawBusiness>, HarvestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidates.clone())
    }
}

/// Fails every fetch with a retryable source error.
pub struct FailingAdapter {
    id: &'static str,
    pub calls: AtomicU32,
}

impl FailingAdapter {
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            calls: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for FailingAdapter {
    fn id(&self) -> &'static str {
        self.id
    }

    async fn fetch_candidates(
        &self,
        _city: &str,
        _industry: &str,
    ) -> Result<Vec<RawBusiness>, HarvestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(HarvestError::source(self.id, "stubbed failure"))
    }
}

/// Reports a rate limit on every fetch.
pub struct ThrottlingAdapter {
    id: &'static str,
    pub calls: AtomicU32,
}

impl ThrottlingAdapter {
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            calls: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for ThrottlingAdapter {
    fn id(&self) -> &'static str {
        self.id
    }

    async fn fetch_candidates(
        &self,
        _city: &str,
        _industry: &str,
    ) -> Result<Vec<RawBusiness>, HarvestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(HarvestError::RateLimited {
            source_id: self.id.to_string(),
        })
    }
}

/// A raw record complete enough to pass validation.
pub fn raw_business(name: &str, city: &str, state: &str) -> RawBusiness {
    RawBusiness {
        name: Some(name.to_string()),
        category: Some("Coffee Shops".to_string()),
        address: Some(format!("1 Main St, {city}")),
        city: Some(city.to_string()),
        state: Some(state.to_string()),
        phone: Some("+15155550100".to_string()),
        source: "stub".to_string(),
        ..Default::default()
    }
}
