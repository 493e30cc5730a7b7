use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use super::extractor::HardFilters;

/// Which catalogs a request searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Intent {
    #[serde(rename = "vendor_search")]
    Vendor,
    #[serde(rename = "venue_search")]
    Venue,
    #[default]
    #[serde(rename = "hybrid_search")]
    Hybrid,
}

impl Intent {
    /// Resolves the caller's flag; anything unrecognised searches both catalogs.
    pub(crate) fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(str::to_lowercase).as_deref() {
            Some("vendor") => Intent::Vendor,
            Some("venue") => Intent::Venue,
            _ => Intent::Hybrid,
        }
    }

    pub(crate) fn includes_vendors(self) -> bool {
        matches!(self, Intent::Vendor | Intent::Hybrid)
    }

    pub(crate) fn includes_venues(self) -> bool {
        matches!(self, Intent::Venue | Intent::Hybrid)
    }
}

/// The typed interpretation of a search query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct StructuredQuery {
    pub(crate) raw_query: String,
    pub(crate) flag: Option<String>,

    pub(crate) min_experience: Option<i64>,
    pub(crate) budget_max: Option<i64>,
    pub(crate) working_since: Option<i64>,
    pub(crate) pincode: Option<String>,

    pub(crate) city: Option<String>,
    pub(crate) state: Option<String>,
    pub(crate) locality: Option<String>,
    pub(crate) entity_name: Option<String>,
    pub(crate) semantic_tags: Vec<String>,

    pub(crate) category: Option<String>,
    pub(crate) style: Option<String>,
    pub(crate) confidence: Option<f64>,

    pub(crate) intent: Intent,
}

impl StructuredQuery {
    pub(crate) fn from_hard_filters(
        raw_query: &str,
        flag: Option<&str>,
        hard: HardFilters,
    ) -> Self {
        Self {
            raw_query: raw_query.to_string(),
            flag: flag.map(str::to_string),
            min_experience: hard.min_experience,
            budget_max: hard.budget_max,
            working_since: hard.working_since,
            pincode: hard.pincode,
            ..Default::default()
        }
    }

    pub(crate) fn hard_filters(&self) -> HardFilters {
        HardFilters {
            min_experience: self.min_experience,
            budget_max: self.budget_max,
            working_since: self.working_since,
            pincode: self.pincode.clone(),
        }
    }

    /// Folds enrichment output into the query.
    ///
    /// | field                                           | policy         |
    /// |-------------------------------------------------|----------------|
    /// | `raw_query`, `flag`, `intent`                   | request owns   |
    /// | `min_experience`, `budget_max`, `working_since` | fill if absent |
    /// | `pincode`                                       | fill if absent |
    /// | `city`, `state`, `locality`, `entity_name`      | fill if absent |
    /// | `semantic_tags`                                 | fill if empty  |
    /// | `category`, `style`, `confidence`               | fill if absent |
    pub(crate) fn merge(&mut self, oracle: EnrichedFields) {
        fill_if_absent(&mut self.min_experience, oracle.min_experience);
        fill_if_absent(&mut self.budget_max, oracle.budget_max);
        fill_if_absent(&mut self.working_since, oracle.working_since);
        fill_if_absent(&mut self.pincode, non_blank(oracle.pincode));

        fill_if_absent(&mut self.city, non_blank(oracle.city));
        fill_if_absent(&mut self.state, non_blank(oracle.state));
        fill_if_absent(&mut self.locality, non_blank(oracle.locality));
        fill_if_absent(&mut self.entity_name, non_blank(oracle.entity_name));
        if self.semantic_tags.is_empty() {
            self.semantic_tags = oracle.semantic_tags;
        }

        fill_if_absent(&mut self.category, non_blank(oracle.category));
        fill_if_absent(&mut self.style, non_blank(oracle.style));
        fill_if_absent(&mut self.confidence, oracle.confidence);
    }
}

fn fill_if_absent<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// What the enrichment oracle returns. Every field is optional, and a
/// field of the wrong type reads as absent instead of failing the record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct EnrichedFields {
    #[serde(default, deserialize_with = "lenient_int")]
    pub(crate) min_experience: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub(crate) budget_max: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub(crate) working_since: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub(crate) pincode: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub(crate) city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub(crate) state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub(crate) locality: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub(crate) entity_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub(crate) semantic_tags: Vec<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub(crate) category: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub(crate) style: Option<String>,
    #[serde(default, deserialize_with = "lenient_float")]
    pub(crate) confidence: Option<f64>,
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Some(s),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                JsonValue::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        JsonValue::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted() -> StructuredQuery {
        StructuredQuery::from_hard_filters(
            "caterers since 2010",
            Some("vendor"),
            HardFilters {
                working_since: Some(2010),
                ..Default::default()
            },
        )
    }

    #[test]
    fn flag_resolution() {
        assert_eq!(Intent::from_flag(Some("vendor")), Intent::Vendor);
        assert_eq!(Intent::from_flag(Some("VENDOR")), Intent::Vendor);
        assert_eq!(Intent::from_flag(Some("Venue")), Intent::Venue);
        assert_eq!(Intent::from_flag(Some("all")), Intent::Hybrid);
        assert_eq!(Intent::from_flag(Some("")), Intent::Hybrid);
        assert_eq!(Intent::from_flag(None), Intent::Hybrid);
        assert!(Intent::Hybrid.includes_vendors() && Intent::Hybrid.includes_venues());
        assert!(!Intent::Vendor.includes_venues());
        assert!(!Intent::Venue.includes_vendors());
    }

    #[test]
    fn merge_never_overrides_extracted_fields() {
        let mut query = extracted();
        query.merge(EnrichedFields {
            working_since: Some(2015),
            min_experience: Some(4),
            city: Some("Meerut".to_string()),
            ..Default::default()
        });
        assert_eq!(query.working_since, Some(2010));
        assert_eq!(query.min_experience, Some(4));
        assert_eq!(query.city.as_deref(), Some("Meerut"));
        assert_eq!(query.raw_query, "caterers since 2010");
    }

    #[test]
    fn merge_ignores_null_and_blank_values() {
        let mut query = extracted();
        query.city = Some("Noida".to_string());
        query.merge(EnrichedFields {
            city: None,
            state: Some("   ".to_string()),
            ..Default::default()
        });
        assert_eq!(query.city.as_deref(), Some("Noida"));
        assert_eq!(query.state, None);
    }

    #[test]
    fn merge_fills_tags_only_when_empty() {
        let mut query = extracted();
        query.merge(EnrichedFields {
            semantic_tags: vec!["royal".to_string()],
            ..Default::default()
        });
        query.merge(EnrichedFields {
            semantic_tags: vec!["rustic".to_string()],
            ..Default::default()
        });
        assert_eq!(query.semantic_tags, ["royal"]);
    }

    #[test]
    fn oracle_output_is_read_leniently() {
        let fields: EnrichedFields = serde_json::from_str(
            r#"{
                "raw_query": "whatever",
                "min_experience": "5",
                "budget_max": 200000.0,
                "working_since": "a while",
                "pincode": 245368,
                "city": "Meerut",
                "state": null,
                "entity_name": ["not", "a", "string"],
                "semantic_tags": ["royal", "", 3, "outdoor"],
                "confidence": "0.8"
            }"#,
        )
        .unwrap();
        assert_eq!(fields.min_experience, Some(5));
        assert_eq!(fields.budget_max, Some(200_000));
        assert_eq!(fields.working_since, None);
        assert_eq!(fields.pincode.as_deref(), Some("245368"));
        assert_eq!(fields.city.as_deref(), Some("Meerut"));
        assert_eq!(fields.state, None);
        assert_eq!(fields.entity_name, None);
        assert_eq!(fields.semantic_tags, ["royal", "outdoor"]);
        assert_eq!(fields.confidence, Some(0.8));
    }

    #[test]
    fn intent_wire_names() {
        let query = StructuredQuery {
            intent: Intent::Vendor,
            ..Default::default()
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["intent"], "vendor_search");
        assert_eq!(json["semantic_tags"], serde_json::json!([]));
        assert!(json["city"].is_null());
    }
}
