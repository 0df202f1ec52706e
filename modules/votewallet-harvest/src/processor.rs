//! Raw-record normalization.
//!
//! `clean` is the single path from a source-shaped [`RawBusiness`] to a
//! canonical [`BusinessRecord`]: whitespace tidied, state reduced to a
//! two-letter code, absent optionals kept as `None` rather than empty
//! strings, lifecycle defaults stamped. Idempotent — cleaning an already
//! canonical record changes nothing.

use chrono::Utc;

use votewallet_common::{BusinessRecord, RawBusiness};

/// Normalize a raw business record into the canonical schema.
///
/// `data_quality` stays 0 pending validation; `is_active` defaults to true;
/// `created_at`/`updated_at` are stamped only when the source did not supply
/// them.
pub fn clean(raw: &RawBusiness) -> BusinessRecord {
    let now = Utc::now();
    let created_at = raw.created_at.unwrap_or(now);
    BusinessRecord {
        id: None,
        name: raw.name.as_deref().map(tidy).unwrap_or_default(),
        description: opt(raw.description.as_deref()),
        category: raw.category.as_deref().map(tidy).unwrap_or_default(),
        address: opt(raw.address.as_deref()),
        city: opt(raw.city.as_deref()),
        state: normalize_state(raw.state.as_deref().unwrap_or("")),
        zip_code: opt(raw.zip_code.as_deref()),
        phone: opt(raw.phone.as_deref()),
        email: opt(raw.email.as_deref()),
        website: opt(raw.website.as_deref()),
        latitude: raw.latitude,
        longitude: raw.longitude,
        rating: raw.rating,
        review_count: raw.review_count,
        image_url: opt(raw.image_url.as_deref()),
        data_quality: 0,
        source: tidy(&raw.source),
        created_at,
        updated_at: raw.updated_at.unwrap_or(created_at),
        is_active: true,
    }
}

/// Project a canonical record back into the raw shape. Used to re-run
/// `clean` over already-processed records (fixpoint check, re-imports).
pub fn as_raw(record: &BusinessRecord) -> RawBusiness {
    RawBusiness {
        name: Some(record.name.clone()),
        description: record.description.clone(),
        category: Some(record.category.clone()),
        address: record.address.clone(),
        city: record.city.clone(),
        state: Some(record.state.clone()),
        zip_code: record.zip_code.clone(),
        phone: record.phone.clone(),
        email: record.email.clone(),
        website: record.website.clone(),
        latitude: record.latitude,
        longitude: record.longitude,
        rating: record.rating,
        review_count: record.review_count,
        image_url: record.image_url.clone(),
        source: record.source.clone(),
        created_at: Some(record.created_at),
        updated_at: Some(record.updated_at),
    }
}

/// Trim and collapse internal whitespace runs to single spaces.
fn tidy(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tidy an optional free-text field; whitespace-only input becomes `None`.
fn opt(s: Option<&str>) -> Option<String> {
    s.map(tidy).filter(|t| !t.is_empty())
}

/// Full state name -> USPS two-letter code.
const STATE_CODES: [(&str, &str); 51] = [
    ("alabama", "AL"),
    ("alaska", "AK"),
    ("arizona", "AZ"),
    ("arkansas", "AR"),
    ("california", "CA"),
    ("colorado", "CO"),
    ("connecticut", "CT"),
    ("delaware", "DE"),
    ("district of columbia", "DC"),
    ("florida", "FL"),
    ("georgia", "GA"),
    ("hawaii", "HI"),
    ("idaho", "ID"),
    ("illinois", "IL"),
    ("indiana", "IN"),
    ("iowa", "IA"),
    ("kansas", "KS"),
    ("kentucky", "KY"),
    ("louisiana", "LA"),
    ("maine", "ME"),
    ("maryland", "MD"),
    ("massachusetts", "MA"),
    ("michigan", "MI"),
    ("minnesota", "MN"),
    ("mississippi", "MS"),
    ("missouri", "MO"),
    ("montana", "MT"),
    ("nebraska", "NE"),
    ("nevada", "NV"),
    ("new hampshire", "NH"),
    ("new jersey", "NJ"),
    ("new mexico", "NM"),
    ("new york", "NY"),
    ("north carolina", "NC"),
    ("north dakota", "ND"),
    ("ohio", "OH"),
    ("oklahoma", "OK"),
    ("oregon", "OR"),
    ("pennsylvania", "PA"),
    ("rhode island", "RI"),
    ("south carolina", "SC"),
    ("south dakota", "SD"),
    ("tennessee", "TN"),
    ("texas", "TX"),
    ("utah", "UT"),
    ("vermont", "VT"),
    ("virginia", "VA"),
    ("washington", "WA"),
    ("west virginia", "WV"),
    ("wisconsin", "WI"),
    ("wyoming", "WY"),
];

/// Normalize a state to its two-letter code.
///
/// Full names map through the fixed table, existing codes pass through
/// uppercased, anything else falls back to the first two letters uppercased.
pub fn normalize_state(input: &str) -> String {
    let trimmed = tidy(input);
    if trimmed.is_empty() {
        return String::new();
    }

    let lower = trimmed.to_lowercase();
    if let Some((_, code)) = STATE_CODES.iter().find(|(name, _)| *name == lower) {
        return (*code).to_string();
    }

    let letters: String = trimmed.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    if letters.len() == 2 {
        return letters.to_uppercase();
    }

    letters.chars().take(2).collect::<String>().to_uppercase()
}
