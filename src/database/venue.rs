use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Tree;

use super::{Database, Document, Field};

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VenueLocation {
    #[serde(default)]
    pub(crate) locality: Option<String>,
    #[serde(default)]
    pub(crate) full_address: Option<String>,
    #[serde(default)]
    pub(crate) city: Option<String>,
    #[serde(default)]
    pub(crate) state: Option<String>,
    #[serde(default)]
    pub(crate) country: Option<String>,
    #[serde(default)]
    pub(crate) google_maps_link: Option<String>,
    #[serde(default)]
    pub(crate) pincode: Option<String>,
}

impl VenueLocation {
    fn field(&self, name: &str) -> Option<Field<'_>> {
        let value = match name {
            "locality" => &self.locality,
            "fullAddress" => &self.full_address,
            "city" => &self.city,
            "state" => &self.state,
            "country" => &self.country,
            "googleMapsLink" => &self.google_maps_link,
            "pincode" => &self.pincode,
            _ => return None,
        };
        value.as_deref().map(Field::Str)
    }
}

/// A bookable venue package from the `venuepackages` collection.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VenuePackage {
    #[serde(default, alias = "_id")]
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) starting_price: Option<i64>,

    #[serde(default)]
    pub(crate) location: VenueLocation,

    #[serde(default)]
    pub(crate) approved: bool,
    #[serde(default = "default_visibility")]
    pub(crate) visibility: String,
    #[serde(default)]
    pub(crate) is_premium: bool,
    #[serde(default)]
    pub(crate) inquiry_count: i64,

    #[serde(default)]
    pub(crate) created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) updated_at: Option<DateTime<Utc>>,
}

pub(crate) const PUBLIC_VISIBILITY: &str = "public";

fn default_visibility() -> String {
    PUBLIC_VISIBILITY.to_string()
}

impl Document for VenuePackage {
    fn tree(db: &Database) -> &Tree {
        &db.venue_tree
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<Field<'_>> {
        if let Some(nested) = name.strip_prefix("location.") {
            return self.location.field(nested);
        }
        match name {
            "title" => Some(Field::Str(&self.title)),
            "description" => self.description.as_deref().map(Field::Str),
            "startingPrice" => self.starting_price.map(Field::Int),
            "visibility" => Some(Field::Str(&self.visibility)),
            "inquiryCount" => Some(Field::Int(self.inquiry_count)),
            _ => None,
        }
    }

    fn project(self, fields: &[&str]) -> Self {
        let keep = |name: &str| fields.contains(&name);
        VenuePackage {
            id: self.id,
            title: if keep("title") {
                self.title
            } else {
                String::new()
            },
            description: self.description.filter(|_| keep("description")),
            starting_price: self.starting_price.filter(|_| keep("startingPrice")),
            location: if keep("location") {
                self.location
            } else {
                VenueLocation::default()
            },
            approved: keep("approved") && self.approved,
            visibility: if keep("visibility") {
                self.visibility
            } else {
                default_visibility()
            },
            is_premium: keep("isPremium") && self.is_premium,
            inquiry_count: if keep("inquiryCount") {
                self.inquiry_count
            } else {
                0
            },
            created_at: self.created_at.filter(|_| keep("createdAt")),
            updated_at: self.updated_at.filter(|_| keep("updatedAt")),
        }
    }
}
