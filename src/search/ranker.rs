//! In-memory relevance ranking over hard-filtered candidates.

use std::cmp::Ordering;

use serde::Serialize;

use super::{candidate::Rankable, structured_query::StructuredQuery};

const ENTITY_NAME_POINTS: u32 = 100;
const PINCODE_POINTS: u32 = 100;
const LOCALITY_POINTS: u32 = 50;
const CITY_POINTS: u32 = 50;
const STATE_POINTS: u32 = 50;
const NUMERIC_POINTS: u32 = 10;
const TAG_IN_NAME_POINTS: u32 = 15;
const TAG_IN_LOCALITY_POINTS: u32 = 13;

/// Number of candidates kept when the relative cut would drop everything.
const FALLBACK_KEEP: usize = 5;

/// A candidate paired with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Scored<T> {
    #[serde(flatten)]
    pub(crate) candidate: T,
    #[serde(rename = "_score")]
    pub(crate) score: u32,
}

fn lower(value: Option<&str>) -> String {
    value.unwrap_or_default().to_lowercase()
}

fn non_empty_lower(value: Option<&str>) -> Option<String> {
    value
        .map(str::to_lowercase)
        .filter(|s| !s.trim().is_empty())
}

/// Additive relevance score; every signal counts independently.
pub(crate) fn compute_score<T: Rankable>(candidate: &T, sq: &StructuredQuery) -> u32 {
    let name = candidate.name().to_lowercase();
    let locality = lower(candidate.locality());
    let mut score = 0;

    if let Some(entity) = non_empty_lower(sq.entity_name.as_deref()) {
        if name.contains(&entity) {
            score += ENTITY_NAME_POINTS;
        }
    }
    if let Some(pincode) = non_empty_lower(sq.pincode.as_deref()) {
        if lower(candidate.pincode()) == pincode {
            score += PINCODE_POINTS;
        }
    }
    if let Some(q_locality) = non_empty_lower(sq.locality.as_deref()) {
        if locality.contains(&q_locality) {
            score += LOCALITY_POINTS;
        }
    }
    if let Some(city) = non_empty_lower(sq.city.as_deref()) {
        if lower(candidate.city()) == city {
            score += CITY_POINTS;
        }
    }
    if let Some(state) = non_empty_lower(sq.state.as_deref()) {
        if lower(candidate.state()) == state {
            score += STATE_POINTS;
        }
    }

    if let (Some(min), Some(have)) = (sq.min_experience, candidate.experience()) {
        if have >= min {
            score += NUMERIC_POINTS;
        }
    }
    if let (Some(year), Some(since)) = (sq.working_since, candidate.working_since()) {
        if since <= year {
            score += NUMERIC_POINTS;
        }
    }
    if let (Some(budget), Some(price)) = (sq.budget_max, candidate.starting_price()) {
        if price <= budget {
            score += NUMERIC_POINTS;
        }
    }

    for tag in sq
        .semantic_tags
        .iter()
        .filter_map(|tag| non_empty_lower(Some(tag.as_str())))
    {
        if name.contains(&tag) {
            score += TAG_IN_NAME_POINTS;
        }
        if locality.contains(&tag) {
            score += TAG_IN_LOCALITY_POINTS;
        }
    }

    score
}

fn by_relevance<T: Rankable>(a: &Scored<T>, b: &Scored<T>) -> Ordering {
    b.score.cmp(&a.score).then_with(|| {
        b.candidate
            .last_active()
            .unwrap_or_default()
            .cmp(a.candidate.last_active().unwrap_or_default())
    })
}

/// Scores every candidate and orders by score, then most recent activity.
/// Ties beyond that keep their input order.
pub(crate) fn rank_results<T: Rankable>(
    candidates: Vec<T>,
    sq: &StructuredQuery,
) -> Vec<Scored<T>> {
    let mut ranked: Vec<Scored<T>> = candidates
        .into_iter()
        .map(|candidate| Scored {
            score: compute_score(&candidate, sq),
            candidate,
        })
        .collect();
    ranked.sort_by(by_relevance);
    ranked
}

/// Keeps candidates scoring at least `threshold_ratio` of the best positive
/// score. A pool without any positive score is dropped; a cut that would
/// leave nothing keeps the first [`FALLBACK_KEEP`] instead.
pub(crate) fn apply_strict_filter<T>(
    results: Vec<Scored<T>>,
    threshold_ratio: f64,
) -> Vec<Scored<T>> {
    let Some(top_score) = results.iter().map(|r| r.score).filter(|&s| s > 0).max() else {
        return Vec::new();
    };
    let threshold = f64::from(top_score) * threshold_ratio;

    if results.iter().any(|r| f64::from(r.score) >= threshold) {
        results
            .into_iter()
            .filter(|r| f64::from(r.score) >= threshold)
            .collect()
    } else {
        results.into_iter().take(FALLBACK_KEEP).collect()
    }
}
