//! Harvest orchestration.
//!
//! Drives the national run: tiers in ascending order, states within a tier
//! concurrently, (city, industry) combinations within a state sequentially in
//! batches. Every adapter call goes through the retry policy; failures are
//! contained at the combination level so one broken source or state never
//! aborts the run.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use votewallet_catalog::CatalogStore;
use votewallet_common::{HarvestError, StateConfig};

use crate::adapters::SourceAdapter;
use crate::monitor::{Monitor, PipelineEvent};
use crate::processor;
use crate::quality;
use crate::registry::StateRegistry;
use crate::report::{RunReport, StateResult, TierResult};
use crate::retry::RetryPolicy;
use crate::session::{Offer, ScrapeSession};

/// Throttle strikes before a source is disabled for the rest of the run.
const THROTTLE_STRIKE_LIMIT: u32 = 3;

#[derive(Debug, Clone)]
pub struct HarvestSettings {
    /// States harvested concurrently within a tier.
    pub max_concurrent_states: usize,
    /// (city, industry) combinations per batch within a state.
    pub batch_size: usize,
    /// Pause between batches within a state.
    pub batch_delay: Duration,
    pub accept_threshold: u8,
    pub retry: RetryPolicy,
    /// Override for the national target; state targets scale proportionally.
    pub target_override: Option<u32>,
    pub tier_filter: Option<u8>,
    pub state_filter: Option<String>,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            max_concurrent_states: 3,
            batch_size: 5,
            batch_delay: Duration::from_secs(1),
            accept_threshold: quality::DEFAULT_ACCEPT_THRESHOLD,
            retry: RetryPolicy::default(),
            target_override: None,
            tier_filter: None,
            state_filter: None,
        }
    }
}

/// What a run would do, resolved from the registry and settings.
pub struct Plan {
    pub tiers: Vec<(u8, Vec<StateConfig>)>,
}

impl Plan {
    pub fn total_target(&self) -> u32 {
        self.tiers
            .iter()
            .flat_map(|(_, states)| states.iter())
            .map(|s| s.business_target)
            .sum()
    }

    pub fn state_count(&self) -> usize {
        self.tiers.iter().map(|(_, states)| states.len()).sum()
    }

    /// Human-readable plan for dry runs.
    pub fn describe(&self) -> String {
        let mut out = format!(
            "Harvest plan: {} states, {} businesses targeted\n",
            self.state_count(),
            self.total_target()
        );
        for (tier, states) in &self.tiers {
            out.push_str(&format!("Tier {tier}:\n"));
            for state in states {
                out.push_str(&format!(
                    "  {} (target {}): {} cities x {} industries\n",
                    state.state,
                    state.business_target,
                    state.cities.len(),
                    state.industries.len()
                ));
            }
        }
        out
    }
}

/// Resolve the registry into a concrete plan, applying tier/state filters and
/// proportional target scaling.
pub fn build_plan(registry: &StateRegistry, settings: &HarvestSettings) -> Plan {
    let scale = settings.target_override.map(|wanted| {
        let total = registry.total_target().max(1);
        wanted as f64 / total as f64
    });

    let mut tiers = Vec::new();
    for tier in 1..=4u8 {
        if settings.tier_filter.is_some_and(|t| t != tier) {
            continue;
        }
        let states: Vec<StateConfig> = registry
            .states_in_tier(tier)
            .into_iter()
            .filter(|s| {
                settings
                    .state_filter
                    .as_deref()
                    .map_or(true, |wanted| s.state.eq_ignore_ascii_case(wanted))
            })
            .map(|s| {
                let mut state = s.clone();
                if let Some(scale) = scale {
                    state.business_target =
                        ((state.business_target as f64 * scale).round() as u32).max(1);
                }
                state
            })
            .collect();
        if !states.is_empty() {
            tiers.push((tier, states));
        }
    }
    Plan { tiers }
}

pub struct Harvester {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    catalog: Arc<dyn CatalogStore>,
    settings: HarvestSettings,
    monitor: Arc<Monitor>,
    disabled: Mutex<HashSet<String>>,
    throttle_strikes: Mutex<HashMap<String, u32>>,
}

impl Harvester {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        catalog: Arc<dyn CatalogStore>,
        settings: HarvestSettings,
        monitor: Arc<Monitor>,
    ) -> Result<Self, HarvestError> {
        if adapters.is_empty() {
            return Err(HarvestError::Config(
                "no sources configured; set at least one source credential".to_string(),
            ));
        }
        Ok(Self {
            adapters,
            catalog,
            settings,
            monitor,
            disabled: Mutex::new(HashSet::new()),
            throttle_strikes: Mutex::new(HashMap::new()),
        })
    }

    /// Run the full plan. Individual state and source failures are recorded
    /// in the report, not surfaced as errors.
    pub async fn run(&self, registry: &StateRegistry) -> Result<RunReport, HarvestError> {
        let plan = build_plan(registry, &self.settings);
        if plan.tiers.is_empty() {
            return Err(HarvestError::Config(
                "plan is empty; check tier/state filters".to_string(),
            ));
        }

        let started_at = Utc::now();
        info!(
            states = plan.state_count(),
            target = plan.total_target(),
            "Starting harvest run"
        );

        let mut tier_results = Vec::new();
        for (tier, states) in &plan.tiers {
            info!(tier, states = states.len(), "Harvesting tier");
            let results: Vec<StateResult> = stream::iter(states)
                .map(|state| self.harvest_state(state))
                .buffer_unordered(self.settings.max_concurrent_states)
                .collect()
                .await;
            tier_results.push(TierResult {
                tier: *tier,
                states: results,
            });
        }

        self.monitor.flush_final();
        Ok(RunReport::new(started_at, tier_results))
    }

    async fn harvest_state(&self, state: &StateConfig) -> StateResult {
        let mut result = StateResult::new(&state.state, state.business_target);
        let mut session = ScrapeSession::new();

        let combos: Vec<(&str, &str)> = state
            .cities
            .iter()
            .flat_map(|city| {
                state
                    .industries
                    .iter()
                    .map(move |industry| (city.as_str(), industry.as_str()))
            })
            .collect();

        info!(
            state = state.state.as_str(),
            target = state.business_target,
            combinations = combos.len(),
            "Harvesting state"
        );

        let batch_size = self.settings.batch_size.max(1);
        let mut batches = combos.chunks(batch_size).peekable();
        'combos: while let Some(batch) = batches.next() {
            for (city, industry) in batch {
                if result.success >= state.business_target {
                    info!(
                        state = state.state.as_str(),
                        accepted = result.success,
                        "State target reached"
                    );
                    break 'combos;
                }
                self.harvest_combo(state, city, industry, &mut session, &mut result)
                    .await;
            }
            if batches.peek().is_some() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }
        }

        result
    }

    async fn harvest_combo(
        &self,
        state: &StateConfig,
        city: &str,
        industry: &str,
        session: &mut ScrapeSession,
        result: &mut StateResult,
    ) {
        for adapter in &self.adapters {
            if self.is_disabled(adapter.id()) {
                continue;
            }

            let op_name = format!("{}:{city}:{industry}", adapter.id());
            let fetched = self
                .settings
                .retry
                .run(&op_name, || adapter.fetch_candidates(city, industry))
                .await;

            let raws = match fetched {
                Ok(raws) => raws,
                Err(e) => {
                    self.monitor.record(PipelineEvent::FetchFailed {
                        source_id: adapter.id().to_string(),
                    });
                    if e.is_throttle() {
                        self.record_throttle_strike(adapter.id());
                    }
                    warn!(source = adapter.id(), city, industry, error = %e, "Fetch failed");
                    result.errors.push(format!("{}: {e}", adapter.id()));
                    continue;
                }
            };

            self.monitor.record(PipelineEvent::CandidatesFetched {
                source_id: adapter.id().to_string(),
                count: raws.len() as u32,
            });

            for raw in &raws {
                result.processed += 1;

                let mut record = processor::clean(raw);
                if record.state.is_empty() {
                    record.state = processor::normalize_state(&state.state);
                }

                let report = quality::validate(&record);
                if !quality::is_accepted(&report, self.settings.accept_threshold) {
                    self.monitor.record(PipelineEvent::ValidationRejected);
                    result.failed += 1;
                    let reason = if report.errors.is_empty() {
                        format!("score {} below threshold", report.score)
                    } else {
                        report.errors.join("; ")
                    };
                    result.errors.push(format!("validation: {reason}"));
                    continue;
                }
                record.data_quality = report.score;

                match session.offer(record) {
                    Offer::Duplicate => {
                        self.monitor.record(PipelineEvent::SessionDuplicate);
                    }
                    Offer::Accepted => {}
                }

                for pending in session.take_pending() {
                    match self.catalog.upsert(&pending).await {
                        Ok(_) => {
                            self.monitor.record(PipelineEvent::Stored);
                            result.success += 1;
                        }
                        Err(e) => {
                            error!(name = pending.name.as_str(), error = %e, "Catalog write failed");
                            result.failed += 1;
                            result.errors.push(format!("catalog: {e}"));
                        }
                    }
                }
            }
        }
    }

    fn is_disabled(&self, source_id: &str) -> bool {
        self.disabled
            .lock()
            .map(|d| d.contains(source_id))
            .unwrap_or(false)
    }

    fn record_throttle_strike(&self, source_id: &str) {
        self.monitor.record(PipelineEvent::Throttled {
            source_id: source_id.to_string(),
        });
        let strikes = {
            let mut map = match self.throttle_strikes.lock() {
                Ok(map) => map,
                Err(_) => return,
            };
            let strikes = map.entry(source_id.to_string()).or_insert(0);
            *strikes += 1;
            *strikes
        };
        if strikes >= THROTTLE_STRIKE_LIMIT {
            if let Ok(mut disabled) = self.disabled.lock() {
                if disabled.insert(source_id.to_string()) {
                    warn!(
                        source = source_id,
                        strikes, "Source disabled for the rest of the run after repeated throttling"
                    );
                    self.monitor.record(PipelineEvent::SourceDisabled {
                        source_id: source_id.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{raw_business, FailingAdapter, StubAdapter, ThrottlingAdapter};
    use votewallet_catalog::MemoryCatalog;
    use votewallet_common::RawBusiness;

    fn test_registry(entries: Vec<StateConfig>) -> StateRegistry {
        StateRegistry::from_entries(entries).unwrap()
    }

    fn iowa(target: u32) -> StateConfig {
        StateConfig {
            state: "Iowa".to_string(),
            tier: 4,
            business_target: target,
            cities: vec!["Des Moines".to_string()],
            industries: vec!["Coffee Shops".to_string()],
        }
    }

    fn fast_settings() -> HarvestSettings {
        HarvestSettings {
            batch_delay: Duration::from_millis(1),
            retry: RetryPolicy {
                max_retries: 1,
                base_delay: Duration::from_millis(1),
                multiplier: 2,
                throttle_factor: 2,
            },
            ..Default::default()
        }
    }

    fn harvester(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        catalog: Arc<MemoryCatalog>,
    ) -> Harvester {
        Harvester::new(adapters, catalog, fast_settings(), Arc::new(Monitor::new())).unwrap()
    }

    #[test]
    fn no_adapters_is_a_config_error() {
        let result = Harvester::new(
            Vec::new(),
            Arc::new(MemoryCatalog::new()),
            HarvestSettings::default(),
            Arc::new(Monitor::new()),
        );
        assert!(matches!(result, Err(HarvestError::Config(_))));
    }

    #[tokio::test]
    async fn valid_and_invalid_candidates_split_into_success_and_failed() {
        // Two good candidates and one with no name, which validation rejects.
        let candidates = vec![
            raw_business("Joe's Coffee", "Des Moines", "IA"),
            raw_business("Prairie Roasters", "Des Moines", "IA"),
            RawBusiness {
                category: Some("Coffee Shops".to_string()),
                city: Some("Des Moines".to_string()),
                source: "stub".to_string(),
                ..Default::default()
            },
        ];
        let catalog = Arc::new(MemoryCatalog::new());
        let h = harvester(
            vec![Arc::new(StubAdapter::new("stub", candidates))],
            catalog.clone(),
        );

        let report = h.run(&test_registry(vec![iowa(300)])).await.unwrap();
        assert_eq!(report.processed(), 3);
        assert_eq!(report.success(), 2);
        assert_eq!(report.tiers[0].states[0].failed, 1);
        assert_eq!(catalog.len().await, 2);
    }

    #[tokio::test]
    async fn validation_rejection_records_the_reason() {
        let candidates = vec![RawBusiness {
            name: Some("No Category Cafe".to_string()),
            city: Some("Des Moines".to_string()),
            source: "stub".to_string(),
            ..Default::default()
        }];
        let h = harvester(
            vec![Arc::new(StubAdapter::new("stub", candidates))],
            Arc::new(MemoryCatalog::new()),
        );

        let report = h.run(&test_registry(vec![iowa(300)])).await.unwrap();
        let state = &report.tiers[0].states[0];
        assert_eq!((state.processed, state.success, state.failed), (1, 0, 1));
        assert_eq!(state.errors.len(), 1);
        assert!(
            state.errors[0].starts_with("validation:") && state.errors[0].contains("category"),
            "got {:?}",
            state.errors
        );
    }

    #[tokio::test]
    async fn batch_size_controls_pacing() {
        // 2 cities x 2 industries = 4 combos, 60ms between batches.
        let mut state = iowa(300);
        state.cities = vec!["Des Moines".to_string(), "Cedar Rapids".to_string()];
        state.industries = vec!["Coffee Shops".to_string(), "Grocery".to_string()];
        let registry = test_registry(vec![state]);

        let run_with = |batch_size: usize| {
            let settings = HarvestSettings {
                batch_size,
                batch_delay: Duration::from_millis(60),
                ..fast_settings()
            };
            let h = Harvester::new(
                vec![Arc::new(StubAdapter::new(
                    "stub",
                    vec![raw_business("Joe's Coffee", "Des Moines", "IA")],
                ))],
                Arc::new(MemoryCatalog::new()),
                settings,
                Arc::new(Monitor::new()),
            )
            .unwrap();
            h
        };

        let start = std::time::Instant::now();
        run_with(1).run(&registry).await.unwrap();
        let small_batches = start.elapsed();

        let start = std::time::Instant::now();
        run_with(4).run(&registry).await.unwrap();
        let one_batch = start.elapsed();

        // batch_size 1: three inter-batch sleeps; batch_size 4: none.
        assert!(
            small_batches >= Duration::from_millis(180),
            "expected 3 batch delays, elapsed {small_batches:?}"
        );
        assert!(
            one_batch < Duration::from_millis(180),
            "single batch should not pause, elapsed {one_batch:?}"
        );
    }

    #[tokio::test]
    async fn session_dedup_collapses_repeat_candidates_across_combos() {
        let candidates = vec![raw_business("Joe's Coffee", "Des Moines", "IA")];
        let mut state = iowa(300);
        state.industries = vec!["Coffee Shops".to_string(), "Restaurants".to_string()];

        let catalog = Arc::new(MemoryCatalog::new());
        let h = harvester(
            vec![Arc::new(StubAdapter::new("stub", candidates))],
            catalog.clone(),
        );

        let report = h.run(&test_registry(vec![state])).await.unwrap();
        // Both combos return the same business; only one write happens.
        assert_eq!(report.success(), 1);
        assert_eq!(catalog.len().await, 1);
        assert_eq!(h.monitor.snapshot().session_duplicates, 1);
    }

    #[tokio::test]
    async fn failing_source_is_recorded_and_other_sources_still_harvest() {
        let catalog = Arc::new(MemoryCatalog::new());
        let good = Arc::new(StubAdapter::new(
            "good",
            vec![raw_business("Joe's Coffee", "Des Moines", "IA")],
        ));
        let bad = Arc::new(FailingAdapter::new("bad"));
        let h = harvester(vec![bad.clone(), good.clone()], catalog.clone());

        let report = h.run(&test_registry(vec![iowa(300)])).await.unwrap();
        assert_eq!(report.success(), 1);
        let state = &report.tiers[0].states[0];
        assert!(state.errors.iter().any(|e| e.starts_with("bad:")));
        // 1 initial call + 1 retry.
        assert_eq!(bad.call_count(), 2);
    }

    #[tokio::test]
    async fn repeated_throttling_disables_the_source() {
        let mut state = iowa(300);
        state.cities = vec!["Des Moines".to_string(), "Cedar Rapids".to_string()];
        state.industries = vec![
            "Coffee Shops".to_string(),
            "Restaurants".to_string(),
            "Grocery".to_string(),
        ];

        let throttled = Arc::new(ThrottlingAdapter::new("throttled"));
        let h = harvester(vec![throttled.clone()], Arc::new(MemoryCatalog::new()));

        let report = h.run(&test_registry(vec![state])).await.unwrap();
        assert_eq!(report.success(), 0);

        let stats = h.monitor.snapshot();
        assert_eq!(stats.sources_disabled, 1);
        assert_eq!(stats.throttle_events, 3);
        // 3 strike combos, each 1 call + 1 retry; the remaining 3 combos skip
        // the disabled source entirely.
        assert_eq!(throttled.call_count(), 6);
    }

    #[tokio::test]
    async fn every_state_in_a_tier_is_harvested() {
        let iowa_cfg = iowa(300);
        let montana = StateConfig {
            state: "Montana".to_string(),
            tier: 4,
            business_target: 200,
            cities: vec!["Billings".to_string()],
            industries: vec!["Grocery".to_string()],
        };

        // The stub serves Iowa-shaped records for both states; geography
        // filtering belongs to real adapters, not the orchestrator.
        let h = harvester(
            vec![Arc::new(StubAdapter::new(
                "stub",
                vec![raw_business("Joe's Coffee", "Des Moines", "IA")],
            ))],
            Arc::new(MemoryCatalog::new()),
        );

        let report = h
            .run(&test_registry(vec![iowa_cfg, montana]))
            .await
            .unwrap();
        assert_eq!(report.tiers[0].states.len(), 2);
        assert_eq!(report.success(), 2);
    }

    #[test]
    fn target_override_scales_states_proportionally() {
        let registry = test_registry(vec![iowa(300), {
            let mut m = iowa(100);
            m.state = "Montana".to_string();
            m
        }]);
        let settings = HarvestSettings {
            target_override: Some(200),
            ..fast_settings()
        };
        let plan = build_plan(&registry, &settings);
        assert_eq!(plan.total_target(), 200);
        let targets: Vec<u32> = plan.tiers[0]
            .1
            .iter()
            .map(|s| s.business_target)
            .collect();
        assert_eq!(targets, vec![150, 50]);
    }

    #[test]
    fn filters_restrict_the_plan() {
        let registry = StateRegistry::load().unwrap();
        let by_tier = build_plan(
            &registry,
            &HarvestSettings {
                tier_filter: Some(4),
                ..Default::default()
            },
        );
        assert!(by_tier.tiers.iter().all(|(t, _)| *t == 4));

        let by_state = build_plan(
            &registry,
            &HarvestSettings {
                state_filter: Some("iowa".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(by_state.state_count(), 1);
        assert_eq!(by_state.tiers[0].1[0].state, "Iowa");
    }

    #[test]
    fn describe_lists_every_planned_state() {
        let registry = StateRegistry::load().unwrap();
        let plan = build_plan(&registry, &HarvestSettings::default());
        let text = plan.describe();
        assert!(text.contains("Iowa"));
        assert!(text.contains("California"));
        assert!(text.contains("Tier 1:"));
    }
}
