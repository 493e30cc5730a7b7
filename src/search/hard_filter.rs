//! Storage-level filtering: what the database may exclude outright.

use tracing::{debug, info, warn};

use super::{
    candidate::{VendorCandidate, VenueCandidate},
    structured_query::StructuredQuery,
};
use crate::database::{venue::PUBLIC_VISIBILITY, Database, Predicate, Query, Vendor, VenuePackage};

const VENDOR_FIELDS: [&str; 10] = [
    "vendorName",
    "experience",
    "teamSize",
    "workingSince",
    "state",
    "city",
    "locality",
    "pincode",
    "lastActive",
    "createdAt",
];

const VENUE_FIELDS: [&str; 8] = [
    "title",
    "startingPrice",
    "location",
    "approved",
    "createdAt",
    "updatedAt",
    "isPremium",
    "inquiryCount",
];

/// Result of one catalog fetch.
#[derive(Debug)]
pub(crate) enum Fetch<T> {
    Fetched(Vec<T>),
    Failed(anyhow::Error),
}

impl<T> Fetch<T> {
    /// Rows to rank; a failed fetch is logged and contributes nothing.
    pub(crate) fn into_rows(self, catalog: &str) -> Vec<T> {
        match self {
            Fetch::Fetched(rows) => {
                info!(catalog, rows = rows.len(), "hard filter fetched candidates");
                rows
            }
            Fetch::Failed(e) => {
                warn!(catalog, "hard filter failed, continuing without it: {e:#}");
                Vec::new()
            }
        }
    }
}

/// Precise filters win; geography applies only when none of them is set,
/// and then state before city.
pub(crate) fn vendor_query(sq: &StructuredQuery, limit: usize) -> Query {
    let mut query = Query::new();
    if let Some(min) = sq.min_experience {
        query = query.filter(Predicate::Gte("experience", min));
    }
    if let Some(year) = sq.working_since {
        query = query.filter(Predicate::Lte("workingSince", year));
    }
    if let Some(name) = non_empty(&sq.entity_name) {
        query = query.filter(Predicate::IContains("vendorName", name.to_string()));
    }
    if let Some(pincode) = non_empty(&sq.pincode) {
        query = query.filter(Predicate::Eq("pincode", pincode.into()));
    }

    let precise = sq.min_experience.is_some()
        || sq.working_since.is_some()
        || sq.entity_name.is_some()
        || sq.pincode.is_some();
    if !precise {
        if let Some(state) = non_empty(&sq.state) {
            query = query.filter(Predicate::IExact("state", state.to_string()));
        } else if let Some(city) = non_empty(&sq.city) {
            query = query.filter(Predicate::IExact("city", city.to_string()));
        }
    }

    query.only(&VENDOR_FIELDS).limit(limit)
}

/// Venues are always public; the budget ceiling is their only numeric filter.
pub(crate) fn venue_query(sq: &StructuredQuery, limit: usize) -> Query {
    let mut query = Query::new().filter(Predicate::Eq("visibility", PUBLIC_VISIBILITY.into()));
    if let Some(budget) = sq.budget_max {
        query = query.filter(Predicate::Lte("startingPrice", budget));
    }
    if let Some(name) = non_empty(&sq.entity_name) {
        query = query.filter(Predicate::IContains("title", name.to_string()));
    }
    query.only(&VENUE_FIELDS).limit(limit)
}

pub(crate) fn fetch_vendors(
    db: &Database,
    sq: &StructuredQuery,
    limit: usize,
) -> Fetch<VendorCandidate> {
    let query = vendor_query(sq, limit);
    debug!(predicates = ?query.predicates(), "vendor hard filter");
    match db.find::<Vendor>(&query) {
        Ok(rows) => Fetch::Fetched(rows.into_iter().map(VendorCandidate::from).collect()),
        Err(e) => Fetch::Failed(e),
    }
}

pub(crate) fn fetch_venues(
    db: &Database,
    sq: &StructuredQuery,
    limit: usize,
) -> Fetch<VenueCandidate> {
    let query = venue_query(sq, limit);
    debug!(predicates = ?query.predicates(), "venue hard filter");
    match db.find::<VenuePackage>(&query) {
        Ok(rows) => Fetch::Fetched(rows.into_iter().map(VenueCandidate::from).collect()),
        Err(e) => Fetch::Failed(e),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{
        query::Value,
        tests::{vendor, venue},
    };

    const LIMIT: usize = 200;

    #[test]
    fn precise_filters_suppress_geography() {
        let sq = StructuredQuery {
            min_experience: Some(5),
            city: Some("Meerut".to_string()),
            state: Some("Uttar Pradesh".to_string()),
            ..Default::default()
        };
        let query = vendor_query(&sq, LIMIT);
        assert_eq!(query.predicates(), [Predicate::Gte("experience", 5)]);
        assert!(!query.constrains("city"));
        assert!(!query.constrains("state"));
    }

    #[test]
    fn all_precise_vendor_filters() {
        let sq = StructuredQuery {
            min_experience: Some(3),
            working_since: Some(2010),
            entity_name: Some("Bite".to_string()),
            pincode: Some("250001".to_string()),
            ..Default::default()
        };
        assert_eq!(
            vendor_query(&sq, LIMIT).predicates(),
            [
                Predicate::Gte("experience", 3),
                Predicate::Lte("workingSince", 2010),
                Predicate::IContains("vendorName", "Bite".to_string()),
                Predicate::Eq("pincode", Value::Str("250001".to_string())),
            ]
        );
    }

    #[test]
    fn state_is_preferred_over_city() {
        let sq = StructuredQuery {
            city: Some("Meerut".to_string()),
            state: Some("Uttar Pradesh".to_string()),
            ..Default::default()
        };
        assert_eq!(
            vendor_query(&sq, LIMIT).predicates(),
            [Predicate::IExact("state", "Uttar Pradesh".to_string())]
        );

        let sq = StructuredQuery {
            city: Some("Meerut".to_string()),
            ..Default::default()
        };
        assert_eq!(
            vendor_query(&sq, LIMIT).predicates(),
            [Predicate::IExact("city", "Meerut".to_string())]
        );
    }

    #[test]
    fn venue_predicates() {
        let sq = StructuredQuery {
            budget_max: Some(200_000),
            entity_name: Some("Royal".to_string()),
            min_experience: Some(10),
            city: Some("Noida".to_string()),
            ..Default::default()
        };
        let query = venue_query(&sq, LIMIT);
        assert_eq!(
            query.predicates(),
            [
                Predicate::Eq("visibility", Value::Str("public".to_string())),
                Predicate::Lte("startingPrice", 200_000),
                Predicate::IContains("title", "Royal".to_string()),
            ]
        );
        assert_eq!(query.row_limit(), Some(LIMIT));
        assert_eq!(query.projection(), Some(&VENUE_FIELDS[..]));
    }

    #[test]
    fn fetches_are_filtered_and_capped() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path()).unwrap();
        for i in 0..5 {
            db.insert(vendor(&format!("Caterer {i}"), "Meerut", i)).unwrap();
        }
        db.insert(venue("Royal Lawn", 150_000)).unwrap();
        db.insert(venue("Budget Banquet", 40_000)).unwrap();
        let mut hidden = venue("Private Villa", 10_000);
        hidden.visibility = "private".to_string();
        db.insert(hidden).unwrap();

        let sq = StructuredQuery {
            min_experience: Some(1),
            budget_max: Some(100_000),
            ..Default::default()
        };
        let vendors = fetch_vendors(&db, &sq, 3).into_rows("vendors");
        assert_eq!(vendors.len(), 3);
        assert!(vendors.iter().all(|v| v.experience >= Some(1)));

        let venues = fetch_venues(&db, &sq, LIMIT).into_rows("venues");
        assert_eq!(venues.len(), 1);
        assert_eq!(venues[0].venue_name, "Budget Banquet");
    }

    #[test]
    fn failed_fetch_degrades_to_empty() {
        let failed: Fetch<VendorCandidate> = Fetch::Failed(anyhow::anyhow!("connection reset"));
        assert!(failed.into_rows("vendors").is_empty());
    }
}
