//! Deterministic extraction of the hard, storage-filterable attributes.
//!
//! Every extractor is a fixed, ordered list of [`Rule`]s evaluated first
//! match wins. Extraction never fails: a rule whose capture does not parse
//! is skipped and the next one is tried.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

/// Words that mark a six-digit number as a postal code rather than an amount.
const GEO_KEYWORDS: [&str; 8] = [
    "near", "in", "at", "around", "pincode", "pin", "area", "location",
];

/// Number of characters inspected before a six-digit candidate.
const PINCODE_CONTEXT_CHARS: usize = 20;

/// Filters recognised directly in the query text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct HardFilters {
    pub(crate) min_experience: Option<i64>,
    pub(crate) budget_max: Option<i64>,
    pub(crate) working_since: Option<i64>,
    pub(crate) pincode: Option<String>,
}

struct Rule<T> {
    name: &'static str,
    regex: Option<Regex>,
    parse: fn(&Captures<'_>) -> Option<T>,
}

impl<T> Rule<T> {
    fn new(name: &'static str, pattern: &str, parse: fn(&Captures<'_>) -> Option<T>) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).ok(),
            parse,
        }
    }

    fn apply(&self, text: &str) -> Option<T> {
        self.regex
            .as_ref()?
            .captures(text)
            .and_then(|caps| (self.parse)(&caps))
    }
}

fn first_match<T>(rules: &[Rule<T>], text: &str) -> Option<T> {
    rules.iter().find_map(|rule| {
        let value = rule.apply(text);
        if value.is_some() {
            tracing::trace!(rule = rule.name, "extraction rule matched");
        }
        value
    })
}

fn first_group(caps: &Captures<'_>) -> Option<i64> {
    caps.get(1)?.as_str().parse().ok()
}

fn amount_with_unit(caps: &Captures<'_>) -> Option<i64> {
    let value = caps.get(1)?.as_str().parse().ok()?;
    normalize_budget(value, caps.get(2).map(|m| m.as_str()))
}

const BUDGET_UNITS: &str = r"(thousand|k|lakh|lac|crore|cr)?";

static BUDGET_RULES: LazyLock<[Rule<i64>; 2]> = LazyLock::new(|| {
    [
        Rule::new(
            "ceiling_keyword",
            &format!(r"(?:under|below|max|upto)\s*(\d+)\s*{BUDGET_UNITS}"),
            amount_with_unit,
        ),
        Rule::new(
            "budget_keyword",
            &format!(r"budget\s*(\d+)\s*{BUDGET_UNITS}"),
            amount_with_unit,
        ),
    ]
});

static EXPERIENCE_RULES: LazyLock<[Rule<i64>; 7]> = LazyLock::new(|| {
    [
        Rule::new("plus_years", r"(\d+)\s*\+\s*(?:years?|yrs?)", first_group),
        Rule::new("more_than", r"more than\s*(\d+)\s*(?:years?|yrs?)", first_group),
        Rule::new(
            "years_experience",
            r"(\d+)\s*(?:years?|yrs?)\s*(?:experience|exp)",
            first_group,
        ),
        Rule::new(
            "experience_of_years",
            r"experience\s*(?:of\s*)?(\d+)\s*(?:years?|yrs?)",
            first_group,
        ),
        Rule::new(
            "years_of_experience",
            r"(\d+)\s*(?:years?|yrs?)\s*of\s*experience",
            first_group,
        ),
        Rule::new("year_experience", r"(\d+)\s*year\s*experience", first_group),
        Rule::new("experience_bare", r"experience\s*(\d+)", first_group),
    ]
});

static WORKING_SINCE_RULES: LazyLock<[Rule<i64>; 6]> = LazyLock::new(|| {
    [
        Rule::new("working_since", r"working since\s*((?:19|20)\d{2})", first_group),
        Rule::new("since", r"since\s*((?:19|20)\d{2})", first_group),
        Rule::new("from", r"from\s*((?:19|20)\d{2})", first_group),
        Rule::new(
            "in_market_since",
            r"in\s*market\s*since\s*((?:19|20)\d{2})",
            first_group,
        ),
        Rule::new(
            "established_in",
            r"established\s*in\s*((?:19|20)\d{2})",
            first_group,
        ),
        Rule::new("since_year", r"since year\s*((?:19|20)\d{2})", first_group),
    ]
});

static SIX_DIGITS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\b\d{6}\b").ok());

/// Scales `value` by a budget unit. Unknown or missing units leave it as is;
/// `None` only on overflow.
pub(crate) fn normalize_budget(value: i64, unit: Option<&str>) -> Option<i64> {
    let factor = match unit.map(str::to_lowercase).as_deref() {
        Some("k" | "thousand") => 1_000,
        Some("lakh" | "lac") => 100_000,
        Some("cr" | "crore") => 10_000_000,
        _ => 1,
    };
    value.checked_mul(factor)
}

/// First six-digit number preceded by a geographic keyword.
pub(crate) fn extract_pincode(query: &str) -> Option<String> {
    SIX_DIGITS.as_ref()?.find_iter(query).find_map(|m| {
        let before = &query[..m.start()];
        let start = before
            .char_indices()
            .rev()
            .nth(PINCODE_CONTEXT_CHARS - 1)
            .map_or(0, |(i, _)| i);
        let window = before[start..].to_lowercase();
        GEO_KEYWORDS
            .iter()
            .any(|keyword| window.contains(keyword))
            .then(|| m.as_str().to_string())
    })
}

/// Maximum budget only; minimum budgets are never extracted.
pub(crate) fn extract_budget(query: &str) -> Option<i64> {
    first_match(&*BUDGET_RULES, &query.to_lowercase())
}

pub(crate) fn extract_experience(query: &str) -> Option<i64> {
    if query.is_empty() {
        return None;
    }
    first_match(&*EXPERIENCE_RULES, &query.to_lowercase())
}

pub(crate) fn extract_working_since(query: &str) -> Option<i64> {
    first_match(&*WORKING_SINCE_RULES, &query.to_lowercase())
}

pub(crate) fn extract_hard_filters(query: &str) -> HardFilters {
    let query = query.to_lowercase();
    HardFilters {
        min_experience: extract_experience(&query),
        budget_max: extract_budget(&query),
        working_since: extract_working_since(&query),
        pincode: extract_pincode(&query),
    }
}
