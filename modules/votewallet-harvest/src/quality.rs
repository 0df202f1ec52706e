//! Data-quality validation.
//!
//! Scoring starts at 100 and subtracts a fixed penalty per defect class.
//! Hard defects (missing name or category, malformed URL/email, out-of-range
//! coordinates) mark the record invalid; soft defects (long name, odd phone,
//! sparse location/contact info) only warn. A record enters the catalog only
//! if it is valid and scores at or above the acceptance threshold.

use std::sync::OnceLock;

use regex::Regex;

use votewallet_common::{BusinessRecord, ValidationReport};

/// Default acceptance cutoff for catalog entry and success reporting.
pub const DEFAULT_ACCEPT_THRESHOLD: u8 = 50;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"))
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Permissive E.164-ish check, applied after separator stripping.
    RE.get_or_init(|| Regex::new(r"^[+]?[1-9]\d{0,15}$").expect("valid regex"))
}

/// Score a canonical record for completeness/correctness.
pub fn validate(record: &BusinessRecord) -> ValidationReport {
    let mut score: i32 = 100;
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut is_valid = true;

    let name_len = record.name.chars().count();
    if record.name.is_empty() {
        score -= 20;
        is_valid = false;
        errors.push("missing name".to_string());
    } else if name_len < 2 {
        score -= 10;
        is_valid = false;
        errors.push("name shorter than 2 characters".to_string());
    } else if name_len > 100 {
        score -= 5;
        warnings.push("name longer than 100 characters".to_string());
    }

    if record.category.is_empty() {
        score -= 15;
        is_valid = false;
        errors.push("missing category".to_string());
    }

    if let Some(website) = &record.website {
        if !is_valid_url(website) {
            score -= 10;
            is_valid = false;
            errors.push(format!("malformed website URL: {website}"));
        }
    }

    if let Some(email) = &record.email {
        if !email_re().is_match(email) {
            score -= 10;
            is_valid = false;
            errors.push(format!("malformed email: {email}"));
        }
    }

    if let Some(phone) = &record.phone {
        let stripped: String = phone
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
            .collect();
        if !phone_re().is_match(&stripped) {
            score -= 5;
            warnings.push(format!("suspect phone number: {phone}"));
        }
    }

    if let Some(lat) = record.latitude {
        if !(-90.0..=90.0).contains(&lat) {
            score -= 10;
            is_valid = false;
            errors.push(format!("latitude out of range: {lat}"));
        }
    }
    if let Some(lng) = record.longitude {
        if !(-180.0..=180.0).contains(&lng) {
            score -= 10;
            is_valid = false;
            errors.push(format!("longitude out of range: {lng}"));
        }
    }

    if let Some(rating) = record.rating {
        if !(0.0..=5.0).contains(&rating) {
            score -= 10;
            is_valid = false;
            errors.push(format!("rating out of range: {rating}"));
        }
    }

    let has_coords = record.latitude.is_some() && record.longitude.is_some();
    if record.address.is_none() && record.city.is_none() && record.zip_code.is_none() && !has_coords
    {
        score -= 8;
        warnings.push("no location information".to_string());
    }

    if record.phone.is_none() && record.email.is_none() && record.website.is_none() {
        score -= 8;
        warnings.push("no contact information".to_string());
    }

    ValidationReport {
        is_valid,
        errors,
        warnings,
        score: score.clamp(0, 100) as u8,
    }
}

/// Whether a validated record clears the acceptance threshold.
pub fn is_accepted(report: &ValidationReport, threshold: u8) -> bool {
    report.is_valid && report.score >= threshold
}

fn is_valid_url(input: &str) -> bool {
    match url::Url::parse(input) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}
