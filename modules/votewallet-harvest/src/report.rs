//! Run reports.
//!
//! A run report rolls per-state outcomes up into tiers and a national
//! summary. JSON for machine consumers, CSV rows for spreadsheets, Display
//! for the console.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResult {
    pub state: String,
    pub target: u32,
    /// Records that went through validation, accepted or not.
    pub processed: u32,
    pub success: u32,
    pub failed: u32,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl StateResult {
    pub fn new(state: &str, target: u32) -> Self {
        Self {
            state: state.to_string(),
            target,
            processed: 0,
            success: 0,
            failed: 0,
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierResult {
    pub tier: u8,
    pub states: Vec<StateResult>,
}

impl TierResult {
    pub fn processed(&self) -> u32 {
        self.states.iter().map(|s| s.processed).sum()
    }

    pub fn success(&self) -> u32 {
        self.states.iter().map(|s| s.success).sum()
    }

    pub fn target(&self) -> u32 {
        self.states.iter().map(|s| s.target).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tiers: Vec<TierResult>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>, tiers: Vec<TierResult>) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            tiers,
        }
    }

    pub fn processed(&self) -> u32 {
        self.tiers.iter().map(|t| t.processed()).sum()
    }

    pub fn success(&self) -> u32 {
        self.tiers.iter().map(|t| t.success()).sum()
    }

    pub fn target(&self) -> u32 {
        self.tiers.iter().map(|t| t.target()).sum()
    }

    /// Accepted records as a share of everything processed.
    pub fn success_rate(&self) -> f64 {
        let processed = self.processed();
        if processed == 0 {
            return 0.0;
        }
        self.success() as f64 / processed as f64
    }

    /// Accepted records as a share of the configured targets.
    pub fn completion_rate(&self) -> f64 {
        let target = self.target();
        if target == 0 {
            return 0.0;
        }
        self.success() as f64 / target as f64
    }

    /// Serialize with the derived aggregates consumers expect: overall and
    /// per-tier target/processed/success counts plus the two rates.
    pub fn to_json(&self) -> anyhow::Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let Some(root) = value.as_object_mut() {
            root.insert("target".to_string(), self.target().into());
            root.insert("processed".to_string(), self.processed().into());
            root.insert("success".to_string(), self.success().into());
            root.insert("successRate".to_string(), self.success_rate().into());
            root.insert("completionRate".to_string(), self.completion_rate().into());
            if let Some(tiers) = root.get_mut("tiers").and_then(|t| t.as_array_mut()) {
                for (tier_value, tier) in tiers.iter_mut().zip(&self.tiers) {
                    if let Some(obj) = tier_value.as_object_mut() {
                        obj.insert("target".to_string(), tier.target().into());
                        obj.insert("processed".to_string(), tier.processed().into());
                        obj.insert("success".to_string(), tier.success().into());
                    }
                }
            }
        }
        Ok(serde_json::to_string_pretty(&value)?)
    }

    /// One row per state: `tier,state,target,processed,success,failed`.
    pub fn csv_rows(&self) -> Vec<String> {
        let mut rows = vec!["tier,state,target,processed,success,failed".to_string()];
        for tier in &self.tiers {
            for state in &tier.states {
                rows.push(format!(
                    "{},{},{},{},{},{}",
                    tier.tier, state.state, state.target, state.processed, state.success,
                    state.failed
                ));
            }
        }
        rows
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Harvest Report ===")?;
        writeln!(f, "Started:  {}", self.started_at.to_rfc3339())?;
        writeln!(f, "Finished: {}", self.finished_at.to_rfc3339())?;
        for tier in &self.tiers {
            writeln!(
                f,
                "\nTier {} ({} / {} target):",
                tier.tier,
                tier.success(),
                tier.target()
            )?;
            for state in &tier.states {
                writeln!(
                    f,
                    "  {}: {} accepted, {} failed of {} processed (target {})",
                    state.state, state.success, state.failed, state.processed, state.target
                )?;
                for error in &state.errors {
                    writeln!(f, "    ! {error}")?;
                }
            }
        }
        writeln!(
            f,
            "\nTotal: {} accepted / {} processed ({:.1}% success, {:.1}% of target)",
            self.success(),
            self.processed(),
            self.success_rate() * 100.0,
            self.completion_rate() * 100.0
        )
    }
}
