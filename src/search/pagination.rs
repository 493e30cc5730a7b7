use serde::Serialize;

pub(crate) const DEFAULT_LIMIT: usize = 10;
pub(crate) const MAX_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Page<T> {
    pub(crate) data: Vec<T>,
    pub(crate) page: usize,
    pub(crate) limit: usize,
    pub(crate) total_results: usize,
    pub(crate) total_pages: usize,
    pub(crate) has_next: bool,
    pub(crate) has_prev: bool,
}

/// Page numbers start at 1; anything lower becomes 1.
pub(crate) fn clamp_page(page: i64) -> usize {
    usize::try_from(page).map_or(1, |page| page.max(1))
}

/// Limits below 1 fall back to the default; the upper bound is capped.
pub(crate) fn clamp_limit(limit: i64) -> usize {
    match usize::try_from(limit) {
        Ok(0) | Err(_) => DEFAULT_LIMIT,
        Ok(limit) => limit.min(MAX_LIMIT),
    }
}

/// Slices an already ranked list.
pub(crate) fn paginate_results<T>(results: Vec<T>, page: i64, limit: i64) -> Page<T> {
    let page = clamp_page(page);
    let limit = clamp_limit(limit);
    let total_results = results.len();
    let total_pages = total_results.div_ceil(limit);

    let start = (page - 1).saturating_mul(limit);
    let data = results.into_iter().skip(start).take(limit).collect();

    Page {
        data,
        page,
        limit,
        total_results,
        total_pages,
        has_next: page < total_pages,
        has_prev: page > 1 && total_results > 0,
    }
}
