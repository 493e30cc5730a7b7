use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Tree;

use super::{Database, Document, Field};

/// A service provider as stored in the `vendors` collection.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Vendor {
    #[serde(default, alias = "_id")]
    pub(crate) id: String,
    pub(crate) vendor_name: String,
    #[serde(default)]
    pub(crate) experience: Option<i64>,
    #[serde(default)]
    pub(crate) team_size: Option<i64>,
    #[serde(default)]
    pub(crate) working_since: Option<i64>,

    #[serde(default)]
    pub(crate) state: Option<String>,
    #[serde(default)]
    pub(crate) city: Option<String>,
    #[serde(default)]
    pub(crate) locality: Option<String>,
    #[serde(default)]
    pub(crate) address: Option<String>,
    #[serde(default)]
    pub(crate) pincode: Option<String>,

    #[serde(default = "default_status")]
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) featured: bool,
    #[serde(default)]
    pub(crate) verified_badge: bool,
    #[serde(default = "default_role")]
    pub(crate) role: String,

    #[serde(default)]
    pub(crate) last_active: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) updated_at: Option<DateTime<Utc>>,
}

fn default_status() -> String {
    "pending".to_string()
}

fn default_role() -> String {
    "vendor".to_string()
}

impl Document for Vendor {
    fn tree(db: &Database) -> &Tree {
        &db.vendor_tree
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<Field<'_>> {
        match name {
            "vendorName" => Some(Field::Str(&self.vendor_name)),
            "experience" => self.experience.map(Field::Int),
            "teamSize" => self.team_size.map(Field::Int),
            "workingSince" => self.working_since.map(Field::Int),
            "state" => self.state.as_deref().map(Field::Str),
            "city" => self.city.as_deref().map(Field::Str),
            "locality" => self.locality.as_deref().map(Field::Str),
            "address" => self.address.as_deref().map(Field::Str),
            "pincode" => self.pincode.as_deref().map(Field::Str),
            "status" => Some(Field::Str(&self.status)),
            "role" => Some(Field::Str(&self.role)),
            _ => None,
        }
    }

    fn project(self, fields: &[&str]) -> Self {
        let keep = |name: &str| fields.contains(&name);
        Vendor {
            id: self.id,
            vendor_name: if keep("vendorName") {
                self.vendor_name
            } else {
                String::new()
            },
            experience: self.experience.filter(|_| keep("experience")),
            team_size: self.team_size.filter(|_| keep("teamSize")),
            working_since: self.working_since.filter(|_| keep("workingSince")),
            state: self.state.filter(|_| keep("state")),
            city: self.city.filter(|_| keep("city")),
            locality: self.locality.filter(|_| keep("locality")),
            address: self.address.filter(|_| keep("address")),
            pincode: self.pincode.filter(|_| keep("pincode")),
            status: if keep("status") {
                self.status
            } else {
                default_status()
            },
            featured: keep("featured") && self.featured,
            verified_badge: keep("verifiedBadge") && self.verified_badge,
            role: if keep("role") {
                self.role
            } else {
                default_role()
            },
            last_active: self.last_active.filter(|_| keep("lastActive")),
            created_at: self.created_at.filter(|_| keep("createdAt")),
            updated_at: self.updated_at.filter(|_| keep("updatedAt")),
        }
    }
}
