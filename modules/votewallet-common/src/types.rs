use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Static registry entry describing one state's scraping scope.
///
/// Tier determines priority and minimum record target: lower tier number
/// means higher target volume. Loaded once at startup, read-only after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    pub state: String,
    /// Priority bucket, 1-4.
    pub tier: u8,
    /// Minimum number of businesses this state should yield. Always > 0.
    pub business_target: u32,
    pub cities: Vec<String>,
    pub industries: Vec<String>,
}

/// Source-shaped business record as an adapter produced it.
///
/// Heterogeneous and untrusted — never persisted directly. The processor
/// turns it into a [`BusinessRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBusiness {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub image_url: Option<String>,
    /// Adapter id that produced this record.
    pub source: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Canonical business entity ready for validation and storage.
///
/// Invariants after cleaning + validation: name >= 2 chars, category
/// non-empty, rating in [0,5], latitude in [-90,90], longitude in [-180,180].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    /// Catalog id. `None` until the sink assigns one on first upsert.
    pub id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub address: Option<String>,
    pub city: Option<String>,
    /// Two-letter state code.
    pub state: String,
    pub zip_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub image_url: Option<String>,
    /// 0-100 completeness/correctness score, 0 until validated.
    pub data_quality: u8,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

/// One member of a duplicate group, with its similarity to the representative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub category: String,
    pub similarity: f64,
}

/// A set of catalog records judged to represent the same real-world business.
///
/// Run-scoped recommendation consumed by a human or automated merge step,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub members: Vec<GroupMember>,
    /// First record encountered in catalog order.
    pub representative_id: Uuid,
    /// Highest similarity between the representative and any member.
    pub confidence: f64,
}

/// Outcome of data-quality validation for a single record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// 0-100, clamped.
    pub score: u8,
}

/// The closed set of political-value axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentAxis {
    Liberal,
    Conservative,
    Libertarian,
    Green,
    Centrist,
}

impl AlignmentAxis {
    pub const ALL: [AlignmentAxis; 5] = [
        AlignmentAxis::Liberal,
        AlignmentAxis::Conservative,
        AlignmentAxis::Libertarian,
        AlignmentAxis::Green,
        AlignmentAxis::Centrist,
    ];
}

/// Non-negative weights over the five political-value axes, 0-100 scale.
///
/// Businesses carry one as authoritative catalog data; users carry one as
/// ephemeral preference state. Both sides use the same scale so the match
/// score is a plain weighted average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentVector {
    values: [f64; 5],
}

impl AlignmentVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, axis: AlignmentAxis) -> f64 {
        self.values[axis as usize]
    }

    /// Set an axis weight. Negative input is clamped to zero.
    pub fn set(&mut self, axis: AlignmentAxis, value: f64) {
        self.values[axis as usize] = value.max(0.0);
    }

    pub fn with(mut self, axis: AlignmentAxis, value: f64) -> Self {
        self.set(axis, value);
        self
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_vector_clamps_negative_weights() {
        let mut v = AlignmentVector::new();
        v.set(AlignmentAxis::Green, -5.0);
        assert_eq!(v.get(AlignmentAxis::Green), 0.0);
    }

    #[test]
    fn alignment_vector_default_is_zero() {
        assert!(AlignmentVector::new().is_zero());
        assert!(!AlignmentVector::new().with(AlignmentAxis::Liberal, 1.0).is_zero());
    }
}
