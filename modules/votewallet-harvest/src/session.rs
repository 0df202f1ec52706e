//! Run-scoped scrape session.
//!
//! Explicit value object threaded through the pipeline instead of a global
//! accumulator: the in-session dedup-by-name check and the catalog write are
//! two distinct steps, each testable on its own.

use std::collections::HashSet;

use votewallet_common::BusinessRecord;

use crate::dedup;

/// Outcome of offering a cleaned record to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// First time this (normalized name, city) was seen — pending write.
    Accepted,
    /// Already collected in this session.
    Duplicate,
}

#[derive(Default)]
pub struct ScrapeSession {
    seen: HashSet<(String, String)>,
    pending: Vec<BusinessRecord>,
}

impl ScrapeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a validated record. Duplicate names (per city) within the
    /// session are dropped here, before any catalog traffic.
    pub fn offer(&mut self, record: BusinessRecord) -> Offer {
        let key = (
            dedup::normalize(&record.name),
            record.city.as_deref().map(dedup::normalize).unwrap_or_default(),
        );
        if self.seen.insert(key) {
            self.pending.push(record);
            Offer::Accepted
        } else {
            Offer::Duplicate
        }
    }

    /// Drain records awaiting a catalog write.
    pub fn take_pending(&mut self) -> Vec<BusinessRecord> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }
}
