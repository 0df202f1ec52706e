//! Run monitoring.
//!
//! Counters are buffered in memory and flushed to the log periodically and
//! once at the end of the run, so progress is visible without a log line per
//! record.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::info;

/// One pipeline occurrence worth counting.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    CandidatesFetched { source_id: String, count: u32 },
    FetchFailed { source_id: String },
    ValidationRejected,
    SessionDuplicate,
    Stored,
    Throttled { source_id: String },
    SourceDisabled { source_id: String },
}

#[derive(Debug, Default, Clone)]
pub struct HarvestStats {
    pub candidates_fetched: u32,
    pub fetches_failed: u32,
    pub validation_rejected: u32,
    pub session_duplicates: u32,
    pub stored: u32,
    pub throttle_events: u32,
    pub sources_disabled: u32,
    pub by_source: HashMap<String, u32>,
}

impl HarvestStats {
    fn apply(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::CandidatesFetched { source_id, count } => {
                self.candidates_fetched += count;
                *self.by_source.entry(source_id.clone()).or_default() += count;
            }
            PipelineEvent::FetchFailed { .. } => self.fetches_failed += 1,
            PipelineEvent::ValidationRejected => self.validation_rejected += 1,
            PipelineEvent::SessionDuplicate => self.session_duplicates += 1,
            PipelineEvent::Stored => self.stored += 1,
            PipelineEvent::Throttled { .. } => self.throttle_events += 1,
            PipelineEvent::SourceDisabled { .. } => self.sources_disabled += 1,
        }
    }
}

impl std::fmt::Display for HarvestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Harvest Run Complete ===")?;
        writeln!(f, "Candidates fetched:  {}", self.candidates_fetched)?;
        writeln!(f, "Fetches failed:      {}", self.fetches_failed)?;
        writeln!(f, "Validation rejected: {}", self.validation_rejected)?;
        writeln!(f, "Session duplicates:  {}", self.session_duplicates)?;
        writeln!(f, "Records stored:      {}", self.stored)?;
        writeln!(f, "Throttle events:     {}", self.throttle_events)?;
        writeln!(f, "Sources disabled:    {}", self.sources_disabled)?;
        writeln!(f, "\nBy source:")?;
        let mut sources: Vec<_> = self.by_source.iter().collect();
        sources.sort_by(|a, b| b.1.cmp(a.1));
        for (source, count) in sources {
            writeln!(f, "  {source}: {count}")?;
        }
        Ok(())
    }
}

/// Thread-safe event sink shared across concurrent state tasks.
#[derive(Default)]
pub struct Monitor {
    stats: Mutex<HarvestStats>,
    flush_every: u32,
    recorded: Mutex<u32>,
}

impl Monitor {
    pub fn new() -> Self {
        Self::with_flush_every(500)
    }

    pub fn with_flush_every(flush_every: u32) -> Self {
        Self {
            stats: Mutex::new(HarvestStats::default()),
            flush_every,
            recorded: Mutex::new(0),
        }
    }

    pub fn record(&self, event: PipelineEvent) {
        if let (Ok(mut stats), Ok(mut recorded)) = (self.stats.lock(), self.recorded.lock()) {
            stats.apply(&event);
            *recorded += 1;
            if self.flush_every > 0 && *recorded % self.flush_every == 0 {
                info!(
                    fetched = stats.candidates_fetched,
                    stored = stats.stored,
                    rejected = stats.validation_rejected,
                    duplicates = stats.session_duplicates,
                    "Harvest progress"
                );
            }
        }
    }

    pub fn snapshot(&self) -> HarvestStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Log the final numbers. Call once at the end of the run.
    pub fn flush_final(&self) {
        let stats = self.snapshot();
        info!(
            fetched = stats.candidates_fetched,
            failed = stats.fetches_failed,
            rejected = stats.validation_rejected,
            duplicates = stats.session_duplicates,
            stored = stats.stored,
            throttled = stats.throttle_events,
            disabled = stats.sources_disabled,
            "Harvest run complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_accumulate_into_counters() {
        let monitor = Monitor::new();
        monitor.record(PipelineEvent::CandidatesFetched {
            source_id: "places".to_string(),
            count: 12,
        });
        monitor.record(PipelineEvent::CandidatesFetched {
            source_id: "reviews".to_string(),
            count: 3,
        });
        monitor.record(PipelineEvent::Stored);
        monitor.record(PipelineEvent::Stored);
        monitor.record(PipelineEvent::ValidationRejected);

        let stats = monitor.snapshot();
        assert_eq!(stats.candidates_fetched, 15);
        assert_eq!(stats.stored, 2);
        assert_eq!(stats.validation_rejected, 1);
        assert_eq!(stats.by_source.get("places"), Some(&12));
    }

    #[test]
    fn display_mentions_every_counter() {
        let monitor = Monitor::new();
        monitor.record(PipelineEvent::Throttled {
            source_id: "places".to_string(),
        });
        monitor.record(PipelineEvent::SourceDisabled {
            source_id: "places".to_string(),
        });
        let rendered = monitor.snapshot().to_string();
        assert!(rendered.contains("Throttle events:     1"));
        assert!(rendered.contains("Sources disabled:    1"));
    }
}
