//! Heuristic address parsing and the derived location aggregates built from
//! it. Locations are never persisted: every dashboard that shows them
//! recomputes the buckets from the business list it is looking at.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Business;

/// City/state pair extracted from a free-text address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLocation {
    pub city: String,
    pub state: String,
}

impl ParsedLocation {
    /// Bucket key used for grouping, e.g. `"Springfield, IL"`
    pub fn key(&self) -> String {
        format!("{}, {}", self.city, self.state)
    }
}

/// Aggregate over all businesses whose address parsed into the same bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationAggregate {
    pub city: String,
    pub state: String,
    pub key: String,
    pub total_businesses: i64,
    pub active_deals: i64,
    pub total_users: i64,
    pub monthly_growth: f64,
}

const US_STATE_NAMES: [&str; 50] = [
    "Alabama",
    "Alaska",
    "Arizona",
    "Arkansas",
    "California",
    "Colorado",
    "Connecticut",
    "Delaware",
    "Florida",
    "Georgia",
    "Hawaii",
    "Idaho",
    "Illinois",
    "Indiana",
    "Iowa",
    "Kansas",
    "Kentucky",
    "Louisiana",
    "Maine",
    "Maryland",
    "Massachusetts",
    "Michigan",
    "Minnesota",
    "Mississippi",
    "Missouri",
    "Montana",
    "Nebraska",
    "Nevada",
    "New Hampshire",
    "New Jersey",
    "New Mexico",
    "New York",
    "North Carolina",
    "North Dakota",
    "Ohio",
    "Oklahoma",
    "Oregon",
    "Pennsylvania",
    "Rhode Island",
    "South Carolina",
    "South Dakota",
    "Tennessee",
    "Texas",
    "Utah",
    "Vermont",
    "Virginia",
    "Washington",
    "West Virginia",
    "Wisconsin",
    "Wyoming",
];

fn state_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^([A-Za-z]{2,3})(?:\s+\d{5})?$").unwrap())
}

/// Extract `{city, state}` from a free-text address following the
/// "street, city, state zip" convention. Best effort: an address with fewer
/// than two comma-separated segments yields `None` and the business is
/// silently dropped from aggregates.
pub fn parse_city_state(address: &str) -> Option<ParsedLocation> {
    let segments: Vec<&str> = address.split(',').map(str::trim).collect();
    if segments.len() < 2 {
        return None;
    }

    let last = segments[segments.len() - 1];
    let second_last = segments[segments.len() - 2];

    // "IL 62701" / "tx" style: 2-3 letter code with an optional ZIP
    if let Some(captures) = state_code_re().captures(last) {
        return Some(ParsedLocation {
            city: second_last.to_string(),
            state: captures[1].to_uppercase(),
        });
    }

    // Full state name, kept as written (not normalized)
    let last_lower = last.to_lowercase();
    if US_STATE_NAMES
        .iter()
        .any(|name| last_lower.contains(&name.to_lowercase()))
    {
        return Some(ParsedLocation {
            city: second_last.to_string(),
            state: last.to_string(),
        });
    }

    // Fallback: best-guess segments, "Unknown" when empty
    let city = if !second_last.is_empty() {
        second_last
    } else {
        segments[0]
    };
    Some(ParsedLocation {
        city: non_empty_or_unknown(city),
        state: non_empty_or_unknown(last),
    })
}

fn non_empty_or_unknown(value: &str) -> String {
    if value.is_empty() {
        "Unknown".to_string()
    } else {
        value.to_string()
    }
}

struct Bucket {
    city: String,
    state: String,
    total_businesses: i64,
    active_deals: i64,
    owners: HashSet<Uuid>,
}

/// Group businesses into city/state buckets with derived counts. Pure
/// projection of the input list: same input, same output, deterministic
/// order (largest bucket first, key as tiebreaker).
pub fn aggregate_locations(businesses: &[Business]) -> Vec<LocationAggregate> {
    let mut buckets: HashMap<String, Bucket> = HashMap::new();

    for business in businesses {
        let Some(parsed) = parse_city_state(&business.address) else {
            continue;
        };
        let bucket = buckets.entry(parsed.key()).or_insert_with(|| Bucket {
            city: parsed.city.clone(),
            state: parsed.state.clone(),
            total_businesses: 0,
            active_deals: 0,
            owners: HashSet::new(),
        });
        bucket.total_businesses += 1;
        if business.has_deals {
            bucket.active_deals += 1;
        }
        bucket.owners.insert(business.owner_user_id);
    }

    let mut aggregates: Vec<LocationAggregate> = buckets
        .into_iter()
        .map(|(key, bucket)| LocationAggregate {
            city: bucket.city,
            state: bucket.state,
            key,
            total_businesses: bucket.total_businesses,
            active_deals: bucket.active_deals,
            total_users: bucket.owners.len() as i64,
            // Placeholder metric: not backed by historical data
            monthly_growth: (bucket.total_businesses as f64 * 2.5) % 20.0 + 5.0,
        })
        .collect();

    aggregates.sort_by(|a, b| {
        b.total_businesses
            .cmp(&a.total_businesses)
            .then_with(|| a.key.cmp(&b.key))
    });

    aggregates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApprovalStatus;
    use chrono::Utc;

    fn business(address: &str, has_deals: bool, owner: Uuid) -> Business {
        let now = Utc::now();
        Business {
            id: Uuid::new_v4(),
            owner_user_id: owner,
            distribution_id: None,
            name: "Test Business".into(),
            category: "Cafe".into(),
            description: String::new(),
            address: address.into(),
            phone: None,
            email: None,
            website: None,
            rating: 0.0,
            review_count: 0,
            image_url: None,
            gallery: Vec::new(),
            featured: false,
            has_deals,
            deal: has_deals.then(|| "10% off".to_string()),
            hours: serde_json::json!({}),
            amenities: Vec::new(),
            approval_status: ApprovalStatus::Approved,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn parses_state_code_with_zip() {
        let parsed = parse_city_state("123 Main St, Springfield, IL 62701").unwrap();
        assert_eq!(parsed.city, "Springfield");
        assert_eq!(parsed.state, "IL");
    }

    #[test]
    fn parses_lowercase_state_code() {
        let parsed = parse_city_state("9 Pine Rd, Denver, co").unwrap();
        assert_eq!(parsed.city, "Denver");
        assert_eq!(parsed.state, "CO");
    }

    #[test]
    fn parses_full_state_name_unnormalized() {
        let parsed = parse_city_state("456 Elm St, Austin, Texas").unwrap();
        assert_eq!(parsed.city, "Austin");
        assert_eq!(parsed.state, "Texas");
    }

    #[test]
    fn falls_back_to_raw_segments() {
        let parsed = parse_city_state("1 High St, Toronto, Ontario M5V").unwrap();
        assert_eq!(parsed.city, "Toronto");
        assert_eq!(parsed.state, "Ontario M5V");
    }

    #[test]
    fn empty_trailing_segment_defaults_to_unknown() {
        let parsed = parse_city_state("Boston,").unwrap();
        assert_eq!(parsed.city, "Boston");
        assert_eq!(parsed.state, "Unknown");
    }

    #[test]
    fn rejects_addresses_without_commas() {
        assert_eq!(parse_city_state("Nowhere"), None);
        assert_eq!(parse_city_state(""), None);
    }

    #[test]
    fn aggregates_same_bucket_counts() {
        let owner_a = Uuid::new_v4();
        let owner_b = Uuid::new_v4();
        let businesses = vec![
            business("1 A St, Boston, MA", true, owner_a),
            business("2 B St, Boston, MA", false, owner_a),
            business("3 C St, Boston, MA", true, owner_b),
        ];

        let aggregates = aggregate_locations(&businesses);
        assert_eq!(aggregates.len(), 1);

        let boston = &aggregates[0];
        assert_eq!(boston.key, "Boston, MA");
        assert_eq!(boston.total_businesses, 3);
        assert_eq!(boston.active_deals, 2);
        assert_eq!(boston.total_users, 2);
        assert_eq!(boston.monthly_growth, (3.0 * 2.5) % 20.0 + 5.0);
    }

    #[test]
    fn unparseable_addresses_are_dropped() {
        let owner = Uuid::new_v4();
        let businesses = vec![
            business("1 A St, Boston, MA", false, owner),
            business("Nowhere", true, owner),
            business("", true, owner),
        ];

        let aggregates = aggregate_locations(&businesses);
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].total_businesses, 1);
        assert_eq!(aggregates[0].active_deals, 0);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let owner = Uuid::new_v4();
        let businesses = vec![
            business("1 A St, Boston, MA", true, owner),
            business("456 Elm St, Austin, Texas", false, owner),
            business("12 Oak St, Portland, OR 97201", true, Uuid::new_v4()),
        ];

        let first = aggregate_locations(&businesses);
        let second = aggregate_locations(&businesses);
        assert_eq!(first, second);
    }

    #[test]
    fn boston_end_to_end_scenario() {
        let owner = Uuid::new_v4();
        let businesses = vec![
            business("1 A St, Boston, MA", true, owner),
            business("2 B St, Boston, MA", false, owner),
        ];

        let aggregates = aggregate_locations(&businesses);
        assert_eq!(aggregates.len(), 1);

        let boston = &aggregates[0];
        assert_eq!(boston.key, "Boston, MA");
        assert_eq!(boston.total_businesses, 2);
        assert_eq!(boston.active_deals, 1);
        assert_eq!(boston.total_users, 1);
    }
}
