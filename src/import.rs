use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::database::{Database, Vendor, VenuePackage};

/// A catalog dump: `{"vendors": [...], "venues": [...]}`.
#[derive(Debug, Default, Deserialize)]
struct Catalog {
    #[serde(default)]
    vendors: Vec<Vendor>,
    #[serde(default)]
    venues: Vec<VenuePackage>,
}

/// Loads a JSON catalog into the database. Documents keep their `_id`
/// when they carry one, so importing the same file twice overwrites.
pub fn import_catalog(db: &Database, path: &Path) -> Result<(usize, usize)> {
    let data = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let catalog: Catalog = serde_json::from_slice(&data)
        .with_context(|| format!("{} is not a valid catalog", path.display()))?;

    let (vendors, venues) = (catalog.vendors.len(), catalog.venues.len());
    for vendor in catalog.vendors {
        db.insert(vendor)?;
    }
    for venue in catalog.venues {
        db.insert(venue)?;
    }
    info!(
        vendors,
        venues,
        stored_vendors = db.count::<Vendor>(),
        stored_venues = db.count::<VenuePackage>(),
        "catalog imported from {}",
        path.display()
    );
    Ok((vendors, venues))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "vendors": [
            {"_id": "v1", "vendorName": "Bite Caterers", "experience": 8, "city": "Meerut",
             "lastActive": "2024-03-01T10:00:00Z"},
            {"vendorName": "Tent House", "workingSince": 2004}
        ],
        "venues": [
            {"title": "Royal Lawn", "startingPrice": 90000,
             "location": {"city": "Ghaziabad", "locality": "Raj Nagar"}}
        ]
    }"#;

    #[test]
    fn imports_both_collections() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(&dir.path().join("db")).unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, CATALOG).unwrap();

        assert_eq!(import_catalog(&db, &path).unwrap(), (2, 1));
        assert_eq!(db.count::<Vendor>(), 2);
        assert_eq!(db.count::<VenuePackage>(), 1);

        let bite = db.select::<Vendor>("v1").unwrap().unwrap();
        assert_eq!(bite.experience, Some(8));
        assert_eq!(bite.status, "pending");

        let venue = db.iter::<VenuePackage>().next().unwrap().unwrap();
        assert_eq!(venue.visibility, "public");
        assert_eq!(venue.location.city.as_deref(), Some("Ghaziabad"));
    }

    #[test]
    fn reimport_overwrites_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(&dir.path().join("db")).unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, r#"{"vendors": [{"_id": "v1", "vendorName": "Bite"}]}"#).unwrap();

        import_catalog(&db, &path).unwrap();
        import_catalog(&db, &path).unwrap();
        assert_eq!(db.count::<Vendor>(), 1);
    }

    #[test]
    fn bad_catalogs_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(&dir.path().join("db")).unwrap();
        assert!(import_catalog(&db, &dir.path().join("missing.json")).is_err());

        let path = dir.path().join("broken.json");
        std::fs::write(&path, r#"{"vendors": [{"experience": 3}]}"#).unwrap();
        assert!(import_catalog(&db, &path).is_err());
    }
}
