//! Pure filtering and pagination for the public directory. Handlers fetch
//! the approved business list once and run it through these functions, so
//! the search semantics stay testable without a database.

use crate::locations::parse_city_state;
use crate::models::{Business, DirectoryQuery, Paged};

/// Apply the directory query to an already-fetched business list, preserving
/// the incoming order. `featured` and `deals` act as restriction flags: only
/// `true` narrows the result.
pub fn apply_filters(businesses: Vec<Business>, query: &DirectoryQuery) -> Vec<Business> {
    businesses
        .into_iter()
        .filter(|business| {
            if let Some(search) = non_blank(&query.search) {
                if !matches_search(business, search) {
                    return false;
                }
            }
            if let Some(category) = non_blank(&query.category) {
                if !business.category.eq_ignore_ascii_case(category) {
                    return false;
                }
            }
            if let Some(location) = non_blank(&query.location) {
                if !matches_location(business, location) {
                    return false;
                }
            }
            if query.featured == Some(true) && !business.featured {
                return false;
            }
            if query.deals == Some(true) && !business.has_deals {
                return false;
            }
            true
        })
        .collect()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn matches_search(business: &Business, search: &str) -> bool {
    let needle = search.to_lowercase();
    business.name.to_lowercase().contains(&needle)
        || business.category.to_lowercase().contains(&needle)
        || business.description.to_lowercase().contains(&needle)
}

/// A business matches a location filter when its parsed `"{city}, {state}"`
/// key or bare city equals the filter. Unparseable addresses never match.
fn matches_location(business: &Business, location: &str) -> bool {
    match parse_city_state(&business.address) {
        Some(parsed) => {
            parsed.key().eq_ignore_ascii_case(location)
                || parsed.city.eq_ignore_ascii_case(location)
        }
        None => false,
    }
}

/// Slice a filtered list into a page. `per_page` is clamped to 1..=100
/// (default 20) and `page` floors at 1.
pub fn paginate<T>(items: Vec<T>, page: Option<i64>, per_page: Option<i64>) -> Paged<T> {
    let per_page = per_page.unwrap_or(20).clamp(1, 100);
    let page = page.unwrap_or(1).max(1);

    let total = items.len() as i64;
    let total_pages = (total + per_page - 1) / per_page;
    let skip = ((page - 1) * per_page) as usize;

    let items = items
        .into_iter()
        .skip(skip)
        .take(per_page as usize)
        .collect();

    Paged {
        items,
        total,
        page,
        per_page,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApprovalStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn business(name: &str, category: &str, address: &str) -> Business {
        let now = Utc::now();
        Business {
            id: Uuid::new_v4(),
            owner_user_id: Uuid::new_v4(),
            distribution_id: None,
            name: name.into(),
            category: category.into(),
            description: format!("{} in town", name),
            address: address.into(),
            phone: None,
            email: None,
            website: None,
            rating: 4.0,
            review_count: 10,
            image_url: None,
            gallery: Vec::new(),
            featured: false,
            has_deals: false,
            deal: None,
            hours: serde_json::json!({}),
            amenities: Vec::new(),
            approval_status: ApprovalStatus::Approved,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample() -> Vec<Business> {
        let mut roastery = business("Bean Roastery", "Cafe", "1 A St, Boston, MA");
        roastery.has_deals = true;
        roastery.deal = Some("Free refill".into());
        let mut books = business("Harbor Books", "Bookstore", "2 B St, Boston, MA");
        books.featured = true;
        let tacos = business("Taco Garden", "Restaurant", "456 Elm St, Austin, Texas");
        vec![roastery, books, tacos]
    }

    #[test]
    fn search_matches_name_category_and_description() {
        let query = DirectoryQuery {
            search: Some("harbor".into()),
            ..Default::default()
        };
        let found = apply_filters(sample(), &query);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Harbor Books");

        let query = DirectoryQuery {
            search: Some("restaurant".into()),
            ..Default::default()
        };
        assert_eq!(apply_filters(sample(), &query).len(), 1);
    }

    #[test]
    fn category_filter_is_exact_case_insensitive() {
        let query = DirectoryQuery {
            category: Some("cafe".into()),
            ..Default::default()
        };
        let found = apply_filters(sample(), &query);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Bean Roastery");
    }

    #[test]
    fn location_filter_uses_parsed_city_or_key() {
        let by_city = DirectoryQuery {
            location: Some("boston".into()),
            ..Default::default()
        };
        assert_eq!(apply_filters(sample(), &by_city).len(), 2);

        let by_key = DirectoryQuery {
            location: Some("Boston, MA".into()),
            ..Default::default()
        };
        assert_eq!(apply_filters(sample(), &by_key).len(), 2);
    }

    #[test]
    fn unparseable_address_never_matches_location() {
        let mut listings = sample();
        listings.push(business("Mystery Spot", "Cafe", "Nowhere"));

        let query = DirectoryQuery {
            location: Some("Nowhere".into()),
            ..Default::default()
        };
        assert!(apply_filters(listings, &query).is_empty());
    }

    #[test]
    fn flag_filters_only_narrow_when_true() {
        let featured = DirectoryQuery {
            featured: Some(true),
            ..Default::default()
        };
        let found = apply_filters(sample(), &featured);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Harbor Books");

        let deals = DirectoryQuery {
            deals: Some(true),
            ..Default::default()
        };
        let found = apply_filters(sample(), &deals);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Bean Roastery");

        let unfiltered = DirectoryQuery {
            featured: Some(false),
            deals: Some(false),
            ..Default::default()
        };
        assert_eq!(apply_filters(sample(), &unfiltered).len(), 3);
    }

    #[test]
    fn pagination_clamps_and_slices() {
        let items: Vec<i32> = (0..45).collect();
        let page = paginate(items.clone(), Some(2), Some(20));
        assert_eq!(page.items, (20..40).collect::<Vec<i32>>());
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages, 3);

        let clamped = paginate(items.clone(), Some(0), Some(1000));
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.per_page, 100);
        assert_eq!(clamped.items.len(), 45);

        let past_end = paginate(items, Some(9), Some(20));
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total_pages, 3);
    }
}
