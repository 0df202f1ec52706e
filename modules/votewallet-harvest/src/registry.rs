//! State/tier registry.
//!
//! Compile-time scraping scope per state: tier (priority/target volume),
//! city list, industry list. The seed list is deduplicated into a map keyed
//! by state at load time; two entries colliding with a different tier or
//! target are a configuration error, caught before any network calls.

use std::collections::BTreeMap;

use votewallet_common::{HarvestError, StateConfig};

#[derive(Debug)]
pub struct StateRegistry {
    states: BTreeMap<String, StateConfig>,
}

impl StateRegistry {
    /// Load the built-in registry.
    pub fn load() -> Result<Self, HarvestError> {
        Self::from_entries(seed_entries())
    }

    /// Build a registry from explicit entries, collapsing exact duplicates
    /// and failing fast on conflicting ones.
    pub fn from_entries(entries: Vec<StateConfig>) -> Result<Self, HarvestError> {
        let mut states: BTreeMap<String, StateConfig> = BTreeMap::new();

        for entry in entries {
            if !(1..=4).contains(&entry.tier) {
                return Err(HarvestError::Config(format!(
                    "state {}: tier {} outside 1-4",
                    entry.state, entry.tier
                )));
            }
            if entry.business_target == 0 {
                return Err(HarvestError::Config(format!(
                    "state {}: business target must be positive",
                    entry.state
                )));
            }
            if entry.cities.is_empty() || entry.industries.is_empty() {
                return Err(HarvestError::Config(format!(
                    "state {}: empty city or industry list",
                    entry.state
                )));
            }

            match states.get(&entry.state) {
                None => {
                    states.insert(entry.state.clone(), entry);
                }
                Some(existing) if *existing == entry => {
                    // Exact duplicate entry, collapse silently.
                }
                Some(existing) => {
                    return Err(HarvestError::Config(format!(
                        "conflicting registry entries for {}: tier {}/target {} vs tier {}/target {}",
                        entry.state,
                        existing.tier,
                        existing.business_target,
                        entry.tier,
                        entry.business_target
                    )));
                }
            }
        }

        Ok(Self { states })
    }

    pub fn state(&self, name: &str) -> Option<&StateConfig> {
        self.states.get(name)
    }

    /// States in a tier, in stable (alphabetical) order.
    pub fn states_in_tier(&self, tier: u8) -> Vec<&StateConfig> {
        self.states.values().filter(|s| s.tier == tier).collect()
    }

    pub fn all(&self) -> impl Iterator<Item = &StateConfig> {
        self.states.values()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn total_target(&self) -> u32 {
        self.states.values().map(|s| s.business_target).sum()
    }
}

fn entry(
    state: &str,
    tier: u8,
    business_target: u32,
    cities: &[&str],
    industries: &[&str],
) -> StateConfig {
    StateConfig {
        state: state.to_string(),
        tier,
        business_target,
        cities: cities.iter().map(|c| c.to_string()).collect(),
        industries: industries.iter().map(|i| i.to_string()).collect(),
    }
}

const CORE_INDUSTRIES: [&str; 8] = [
    "Restaurants",
    "Coffee Shops",
    "Grocery",
    "Retail",
    "Home Services",
    "Health & Wellness",
    "Auto Services",
    "Professional Services",
];

const RURAL_INDUSTRIES: [&str; 6] = [
    "Restaurants",
    "Grocery",
    "Agriculture",
    "Hardware",
    "Auto Services",
    "Health & Wellness",
];

/// Built-in scraping scope. Tier 1 carries the largest targets; tier 4 the
/// smallest.
fn seed_entries() -> Vec<StateConfig> {
    vec![
        // --- Tier 1 ---
        entry(
            "California",
            1,
            5000,
            &["Los Angeles", "San Francisco", "San Diego", "Sacramento", "San Jose", "Fresno"],
            &CORE_INDUSTRIES,
        ),
        entry(
            "Texas",
            1,
            5000,
            &["Houston", "Dallas", "Austin", "San Antonio", "Fort Worth", "El Paso"],
            &CORE_INDUSTRIES,
        ),
        entry(
            "New York",
            1,
            4500,
            &["New York", "Buffalo", "Rochester", "Albany", "Syracuse"],
            &CORE_INDUSTRIES,
        ),
        entry(
            "Florida",
            1,
            4000,
            &["Miami", "Orlando", "Tampa", "Jacksonville", "Tallahassee"],
            &CORE_INDUSTRIES,
        ),
        // --- Tier 2 ---
        entry(
            "Illinois",
            2,
            2500,
            &["Chicago", "Springfield", "Peoria", "Rockford"],
            &CORE_INDUSTRIES,
        ),
        entry(
            "Pennsylvania",
            2,
            2500,
            &["Philadelphia", "Pittsburgh", "Harrisburg", "Allentown"],
            &CORE_INDUSTRIES,
        ),
        entry(
            "Ohio",
            2,
            2000,
            &["Columbus", "Cleveland", "Cincinnati", "Toledo"],
            &CORE_INDUSTRIES,
        ),
        entry(
            "Georgia",
            2,
            2000,
            &["Atlanta", "Savannah", "Augusta", "Athens"],
            &CORE_INDUSTRIES,
        ),
        // --- Tier 3 ---
        entry(
            "Colorado",
            3,
            1000,
            &["Denver", "Colorado Springs", "Boulder"],
            &CORE_INDUSTRIES,
        ),
        entry(
            "Minnesota",
            3,
            1000,
            &["Minneapolis", "St. Paul", "Duluth"],
            &CORE_INDUSTRIES,
        ),
        entry(
            "Oregon",
            3,
            800,
            &["Portland", "Eugene", "Salem"],
            &CORE_INDUSTRIES,
        ),
        entry(
            "North Carolina",
            3,
            1000,
            &["Charlotte", "Raleigh", "Durham", "Asheville"],
            &CORE_INDUSTRIES,
        ),
        // --- Tier 4 ---
        entry(
            "Iowa",
            4,
            300,
            &["Des Moines", "Cedar Rapids"],
            &RURAL_INDUSTRIES,
        ),
        entry(
            "Montana",
            4,
            200,
            &["Billings", "Missoula"],
            &RURAL_INDUSTRIES,
        ),
        entry(
            "Vermont",
            4,
            150,
            &["Burlington", "Montpelier"],
            &RURAL_INDUSTRIES,
        ),
        entry(
            "Wyoming",
            4,
            150,
            &["Cheyenne", "Casper"],
            &RURAL_INDUSTRIES,
        ),
    ]
}
