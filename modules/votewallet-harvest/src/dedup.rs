//! Fuzzy deduplication over the catalog snapshot.
//!
//! Pairwise similarity is a weighted blend of Jaro name similarity, Jaro
//! address similarity, and exact category match. Grouping is greedy
//! first-match-wins in catalog order: each record lands in at most one group
//! per pass. That trades clustering optimality for O(n^2) single-pass
//! simplicity — acceptable while catalog size per run is bounded by tier
//! targets. Runs offline against a full snapshot, never interleaved with
//! live ingestion.

use votewallet_common::{BusinessRecord, DuplicateGroup, GroupMember};

/// Default grouping threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.85;

const NAME_WEIGHT: f64 = 0.6;
const ADDRESS_WEIGHT: f64 = 0.3;
const CATEGORY_WEIGHT: f64 = 0.1;

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Jaro similarity between two strings.
///
/// Characters match within a window of `max(len1, len2) / 2 - 1`;
/// transpositions are counted among matched characters; similarity is the
/// mean of (m/len1, m/len2, (m - t/2)/m). Both empty -> 1.0, one empty or
/// no matches -> 0.0.
pub fn jaro(a: &str, b: &str) -> f64 {
    let s1: Vec<char> = a.chars().collect();
    let s2: Vec<char> = b.chars().collect();

    if s1.is_empty() && s2.is_empty() {
        return 1.0;
    }
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }

    let window = (s1.len().max(s2.len()) / 2).saturating_sub(1);

    let mut matched1 = vec![false; s1.len()];
    let mut matched2 = vec![false; s2.len()];
    let mut matches = 0usize;

    for (i, c1) in s1.iter().enumerate() {
        let lo = i.saturating_sub(window);
        let hi = (i + window + 1).min(s2.len());
        for j in lo..hi {
            if !matched2[j] && s2[j] == *c1 {
                matched1[i] = true;
                matched2[j] = true;
                matches += 1;
                break;
            }
        }
    }

    if matches == 0 {
        return 0.0;
    }

    // Transpositions: matched characters out of relative order.
    let mut transpositions = 0usize;
    let mut j = 0usize;
    for (i, flag) in matched1.iter().enumerate() {
        if !flag {
            continue;
        }
        while !matched2[j] {
            j += 1;
        }
        if s1[i] != s2[j] {
            transpositions += 1;
        }
        j += 1;
    }

    let m = matches as f64;
    (m / s1.len() as f64 + m / s2.len() as f64 + (m - transpositions as f64 / 2.0) / m) / 3.0
}

/// Jaro similarity over normalized strings.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    jaro(&normalize(a), &normalize(b))
}

/// Overall pairwise similarity: 0.6 name + 0.3 address + 0.1 category.
/// The address term is zero unless both records carry an address; the
/// category term is exact-match 1/0.
pub fn record_similarity(a: &BusinessRecord, b: &BusinessRecord) -> f64 {
    let name = name_similarity(&a.name, &b.name);

    let address = match (&a.address, &b.address) {
        (Some(addr_a), Some(addr_b)) => name_similarity(addr_a, addr_b),
        _ => 0.0,
    };

    let category = if a.category == b.category { 1.0 } else { 0.0 };

    NAME_WEIGHT * name + ADDRESS_WEIGHT * address + CATEGORY_WEIGHT * category
}

/// Group near-duplicates across the catalog snapshot.
///
/// Greedy first-match-wins: pairs at or above `threshold` join the earlier
/// record's group; the representative is the first record encountered in
/// catalog order; confidence is the highest representative-to-member
/// similarity (member-to-member pairs are not compared). Records without a
/// catalog id are skipped.
pub fn find_duplicate_groups(records: &[BusinessRecord], threshold: f64) -> Vec<DuplicateGroup> {
    let mut assigned = vec![false; records.len()];
    let mut groups = Vec::new();

    for i in 0..records.len() {
        if assigned[i] || records[i].id.is_none() {
            continue;
        }

        let mut members = Vec::new();
        let mut confidence: f64 = 0.0;

        for j in (i + 1)..records.len() {
            if assigned[j] || records[j].id.is_none() {
                continue;
            }
            let similarity = record_similarity(&records[i], &records[j]);
            if similarity >= threshold {
                assigned[j] = true;
                confidence = confidence.max(similarity);
                members.push(member_of(&records[j], similarity));
            }
        }

        if members.is_empty() {
            continue;
        }

        assigned[i] = true;
        let representative_id = records[i].id.expect("checked above");
        members.insert(0, member_of(&records[i], 1.0));
        groups.push(DuplicateGroup {
            members,
            representative_id,
            confidence,
        });
    }

    groups
}

fn member_of(record: &BusinessRecord, similarity: f64) -> GroupMember {
    GroupMember {
        id: record.id.expect("snapshot records carry ids"),
        name: record.name.clone(),
        address: record.address.clone(),
        category: record.category.clone(),
        similarity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(name: &str, address: Option<&str>, category: &str) -> BusinessRecord {
        BusinessRecord {
            id: Some(Uuid::new_v4()),
            name: name.to_string(),
            description: None,
            category: category.to_string(),
            address: address.map(|a| a.to_string()),
            city: Some("Des Moines".to_string()),
            state: "IA".to_string(),
            zip_code: None,
            phone: None,
            email: None,
            website: None,
            latitude: None,
            longitude: None,
            rating: None,
            review_count: None,
            image_url: None,
            data_quality: 80,
            source: "test".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_active: true,
        }
    }

    // --- jaro ---

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(jaro("coffee", "coffee"), 1.0);
    }

    #[test]
    fn both_empty_score_one() {
        assert_eq!(jaro("", ""), 1.0);
    }

    #[test]
    fn one_empty_scores_zero() {
        assert_eq!(jaro("coffee", ""), 0.0);
        assert_eq!(jaro("", "coffee"), 0.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(jaro("abc", "xyz"), 0.0);
    }

    #[test]
    fn near_duplicates_score_high() {
        let sim = jaro("joes coffee", "joe s coffee");
        assert!(sim > 0.9, "got {sim}");
    }

    #[test]
    fn jaro_is_symmetric() {
        let a = "martha";
        let b = "marhta";
        assert!((jaro(a, b) - jaro(b, a)).abs() < 1e-12);
        // Classic Jaro example: 0.944...
        assert!((jaro(a, b) - 0.9444444444444445).abs() < 1e-9);
    }

    // --- normalize ---

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("Joe's   Coffee!"), "joe s coffee");
        assert_eq!(normalize("  JOE S COFFEE "), "joe s coffee");
    }

    // --- record similarity ---

    #[test]
    fn address_term_requires_both_addresses() {
        let a = record("Joe's Coffee", Some("1 Main St"), "Coffee");
        let b = record("Joe's Coffee", None, "Coffee");
        let sim = record_similarity(&a, &b);
        // name 1.0 * 0.6 + address 0 + category 1.0 * 0.1
        assert!((sim - 0.7).abs() < 1e-9, "got {sim}");
    }

    #[test]
    fn category_mismatch_drops_its_weight() {
        let a = record("Joe's Coffee", Some("1 Main St"), "Coffee");
        let b = record("Joe's Coffee", Some("1 Main St"), "Bakery");
        let sim = record_similarity(&a, &b);
        assert!((sim - 0.9).abs() < 1e-9, "got {sim}");
    }

    // --- grouping ---

    #[test]
    fn near_duplicate_pair_is_grouped_at_085() {
        let a = record("Joe's Coffee", Some("1 Main St"), "Coffee");
        let b = record("Joes Coffee", Some("1 Main Street"), "Coffee");
        let groups = find_duplicate_groups(&[a.clone(), b], DEFAULT_THRESHOLD);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 2);
        assert_eq!(groups[0].representative_id, a.id.unwrap());
        assert!(groups[0].confidence >= 0.85, "confidence {}", groups[0].confidence);
    }

    #[test]
    fn distinct_businesses_are_not_grouped() {
        let a = record("Joe's Coffee", Some("1 Main St"), "Coffee");
        let b = record("Prairie Hardware", Some("42 Elm Ave"), "Hardware");
        let groups = find_duplicate_groups(&[a, b], DEFAULT_THRESHOLD);
        assert!(groups.is_empty());
    }

    #[test]
    fn grouping_is_symmetric_under_reversal() {
        let a = record("Joe's Coffee", Some("1 Main St"), "Coffee");
        let b = record("Joes Coffee", Some("1 Main Street"), "Coffee");

        let forward = find_duplicate_groups(&[a.clone(), b.clone()], DEFAULT_THRESHOLD);
        let reverse = find_duplicate_groups(&[b.clone(), a.clone()], DEFAULT_THRESHOLD);

        assert_eq!(forward.len(), 1);
        assert_eq!(reverse.len(), 1);
        let ids = |g: &DuplicateGroup| {
            let mut v: Vec<_> = g.members.iter().map(|m| m.id).collect();
            v.sort();
            v
        };
        assert_eq!(ids(&forward[0]), ids(&reverse[0]));
        // Representative follows catalog order, so it differs by direction.
        assert_eq!(forward[0].representative_id, a.id.unwrap());
        assert_eq!(reverse[0].representative_id, b.id.unwrap());
    }

    #[test]
    fn each_record_lands_in_at_most_one_group() {
        let a = record("Joe's Coffee", Some("1 Main St"), "Coffee");
        let b = record("Joes Coffee", Some("1 Main Street"), "Coffee");
        let c = record("Joe's Coffee Co", Some("1 Main St"), "Coffee");
        let groups = find_duplicate_groups(&[a, b, c], DEFAULT_THRESHOLD);

        let total: usize = groups.iter().map(|g| g.members.len()).sum();
        let mut all_ids: Vec<_> = groups
            .iter()
            .flat_map(|g| g.members.iter().map(|m| m.id))
            .collect();
        all_ids.sort();
        all_ids.dedup();
        assert_eq!(all_ids.len(), total, "a record appeared in two groups");
    }

    #[test]
    fn representative_is_first_in_catalog_order() {
        let a = record("Corner Bakery", Some("9 Oak St"), "Bakery");
        let b = record("Corner Bakary", Some("9 Oak Street"), "Bakery");
        let c = record("Unrelated Gym", Some("5 Pine Rd"), "Fitness");
        let groups = find_duplicate_groups(&[c, a.clone(), b], DEFAULT_THRESHOLD);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].representative_id, a.id.unwrap());
        assert_eq!(groups[0].members[0].similarity, 1.0);
    }

    #[test]
    fn confidence_is_the_best_representative_match() {
        let a = record("Joe's Coffee", Some("1 Main St"), "Coffee");
        let b = record("Joes Coffee", Some("1 Main St"), "Coffee");
        let c = record("Joe's Coffee Co", Some("1 Main St"), "Coffee");
        let groups = find_duplicate_groups(&[a, b, c], DEFAULT_THRESHOLD);
        assert_eq!(groups.len(), 1);

        let best = groups[0]
            .members
            .iter()
            .skip(1)
            .map(|m| m.similarity)
            .fold(f64::MIN, f64::max);
        assert_eq!(groups[0].confidence, best);
        assert!(groups[0].confidence < 1.0);
    }

    #[test]
    fn records_without_ids_are_skipped() {
        let mut a = record("Joe's Coffee", Some("1 Main St"), "Coffee");
        a.id = None;
        let b = record("Joes Coffee", Some("1 Main Street"), "Coffee");
        let groups = find_duplicate_groups(&[a, b], DEFAULT_THRESHOLD);
        assert!(groups.is_empty());
    }
}
