use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::database::{Vendor, VenuePackage};

/// Timestamps leave the service as RFC 3339 in UTC with a fixed width, so
/// comparing the strings compares the instants.
fn iso8601(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VendorCandidate {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    pub(crate) vendor_name: String,
    pub(crate) experience: Option<i64>,
    pub(crate) team_size: Option<i64>,
    pub(crate) working_since: Option<i64>,
    pub(crate) state: Option<String>,
    pub(crate) city: Option<String>,
    pub(crate) locality: Option<String>,
    pub(crate) pincode: Option<String>,
    pub(crate) last_active: Option<String>,
    pub(crate) created_at: Option<String>,
}

impl From<Vendor> for VendorCandidate {
    fn from(vendor: Vendor) -> Self {
        Self {
            id: vendor.id,
            vendor_name: vendor.vendor_name,
            experience: vendor.experience,
            team_size: vendor.team_size,
            working_since: vendor.working_since,
            state: vendor.state,
            city: vendor.city,
            locality: vendor.locality,
            pincode: vendor.pincode,
            last_active: iso8601(vendor.last_active),
            created_at: iso8601(vendor.created_at),
        }
    }
}

/// The nested location copy kept for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct LocationView {
    pub(crate) locality: Option<String>,
    pub(crate) city: Option<String>,
    pub(crate) state: Option<String>,
    pub(crate) pincode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VenueCandidate {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    pub(crate) venue_name: String,
    pub(crate) starting_price: Option<i64>,
    pub(crate) approved: bool,
    pub(crate) is_premium: bool,
    pub(crate) inquiry_count: i64,
    pub(crate) locality: Option<String>,
    pub(crate) city: Option<String>,
    pub(crate) state: Option<String>,
    pub(crate) pincode: Option<String>,
    pub(crate) location: LocationView,
    pub(crate) created_at: Option<String>,
    pub(crate) updated_at: Option<String>,
}

impl From<VenuePackage> for VenueCandidate {
    fn from(venue: VenuePackage) -> Self {
        let location = LocationView {
            locality: venue.location.locality,
            city: venue.location.city,
            state: venue.location.state,
            pincode: venue.location.pincode,
        };
        Self {
            id: venue.id,
            venue_name: venue.title,
            starting_price: venue.starting_price,
            approved: venue.approved,
            is_premium: venue.is_premium,
            inquiry_count: venue.inquiry_count,
            locality: location.locality.clone(),
            city: location.city.clone(),
            state: location.state.clone(),
            pincode: location.pincode.clone(),
            location,
            created_at: iso8601(venue.created_at),
            updated_at: iso8601(venue.updated_at),
        }
    }
}

/// The attributes the ranker reads, whatever the entity type.
pub(crate) trait Rankable {
    fn name(&self) -> &str;
    fn city(&self) -> Option<&str>;
    fn state(&self) -> Option<&str>;
    fn locality(&self) -> Option<&str>;
    fn pincode(&self) -> Option<&str>;
    fn experience(&self) -> Option<i64> {
        None
    }
    fn working_since(&self) -> Option<i64> {
        None
    }
    fn starting_price(&self) -> Option<i64> {
        None
    }
    /// Recency tie-break key; ISO-8601 so it orders lexicographically.
    fn last_active(&self) -> Option<&str> {
        None
    }
}

impl Rankable for VendorCandidate {
    fn name(&self) -> &str {
        &self.vendor_name
    }

    fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    fn locality(&self) -> Option<&str> {
        self.locality.as_deref()
    }

    fn pincode(&self) -> Option<&str> {
        self.pincode.as_deref()
    }

    fn experience(&self) -> Option<i64> {
        self.experience
    }

    fn working_since(&self) -> Option<i64> {
        self.working_since
    }

    fn last_active(&self) -> Option<&str> {
        self.last_active.as_deref()
    }
}

impl Rankable for VenueCandidate {
    fn name(&self) -> &str {
        &self.venue_name
    }

    fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    fn locality(&self) -> Option<&str> {
        self.locality.as_deref()
    }

    fn pincode(&self) -> Option<&str> {
        self.pincode.as_deref()
    }

    fn starting_price(&self) -> Option<i64> {
        self.starting_price
    }
}
