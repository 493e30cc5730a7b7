pub(crate) mod candidate;
pub(crate) mod enrichment;
pub(crate) mod extractor;
pub(crate) mod hard_filter;
pub(crate) mod pagination;
pub(crate) mod ranker;
pub(crate) mod structured_query;

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{task, time::Instant};
use tracing::{debug, info, warn};

pub(crate) use self::enrichment::{ChatEnricher, Enricher};
use self::{
    candidate::{VendorCandidate, VenueCandidate},
    enrichment::{Enrichment, SkipReason},
    hard_filter::Fetch,
    pagination::{clamp_limit, clamp_page, paginate_results},
    ranker::{apply_strict_filter, rank_results, Scored},
    structured_query::{Intent, StructuredQuery},
};
use crate::{database::Database, settings::Settings};

const EMPTY_QUERY_MESSAGE: &str = "Empty search query. Please provide search keywords.";

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchRequest {
    pub(crate) query: String,
    #[serde(default)]
    pub(crate) flag: Option<String>,
    #[serde(default = "default_page")]
    pub(crate) page: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
    #[serde(default)]
    pub(crate) threshold_ratio: Option<f64>,
}

/// The query echo: the parsed interpretation, or a notice when there was
/// nothing to parse.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum QueryEcho {
    Parsed(StructuredQuery),
    Empty {
        raw_query: String,
        message: &'static str,
    },
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub(crate) struct Pagination {
    pub(crate) page: usize,
    pub(crate) limit: usize,
    pub(crate) total_vendor_results: usize,
    pub(crate) total_venue_results: usize,
    pub(crate) total_pages_vendors: usize,
    pub(crate) total_pages_venues: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchResponse {
    pub(crate) structured_query: QueryEcho,
    pub(crate) vendors: Vec<Scored<VendorCandidate>>,
    pub(crate) venues: Vec<Scored<VenueCandidate>>,
    pub(crate) pagination: Pagination,
    pub(crate) execution_time_ms: f64,
}

impl SearchResponse {
    fn empty(request: &SearchRequest) -> Self {
        Self {
            structured_query: QueryEcho::Empty {
                raw_query: String::new(),
                message: EMPTY_QUERY_MESSAGE,
            },
            vendors: Vec::new(),
            venues: Vec::new(),
            pagination: Pagination {
                page: clamp_page(request.page),
                limit: clamp_limit(request.limit),
                ..Default::default()
            },
            execution_time_ms: 0.0,
        }
    }
}

/// The search pipeline and the collaborators it runs against.
pub(crate) struct SearchEngine {
    db: Database,
    enricher: Option<Arc<dyn Enricher>>,
    enrichment_timeout: Duration,
    candidate_limit: usize,
    threshold_ratio: f64,
}

impl SearchEngine {
    pub(crate) fn new(
        db: Database,
        enricher: Option<Arc<dyn Enricher>>,
        settings: &Settings,
    ) -> Self {
        Self {
            db,
            enricher,
            enrichment_timeout: settings.enrichment.timeout(),
            candidate_limit: settings.search.candidate_limit,
            threshold_ratio: settings.search.threshold_ratio,
        }
    }

    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Extraction, enrichment and intent resolution.
    pub(crate) async fn understand(&self, raw_query: &str, flag: Option<&str>) -> StructuredQuery {
        let hard = extractor::extract_hard_filters(raw_query);
        let mut sq = StructuredQuery::from_hard_filters(raw_query, flag, hard);

        let outcome = enrichment::enrich(
            self.enricher.as_deref(),
            raw_query,
            &sq.hard_filters(),
            self.enrichment_timeout,
        )
        .await;
        match outcome {
            Enrichment::Applied(fields) => sq.merge(fields),
            Enrichment::Skipped(reason @ SkipReason::Disabled) => info!("{reason}"),
            Enrichment::Skipped(reason) => warn!("{reason}, using extracted filters only"),
        }

        sq.intent = Intent::from_flag(flag);
        debug!(structured_query = ?sq, "query understood");
        sq
    }

    pub(crate) async fn search(&self, request: SearchRequest) -> SearchResponse {
        if request.query.trim().is_empty() {
            return SearchResponse::empty(&request);
        }
        let started = Instant::now();

        let sq = self.understand(&request.query, request.flag.as_deref()).await;
        let (vendors, venues) = self.fetch(&sq).await;

        let ratio = request.threshold_ratio.unwrap_or(self.threshold_ratio);
        let vendors = apply_strict_filter(rank_results(vendors, &sq), ratio);
        let venues = apply_strict_filter(rank_results(venues, &sq), ratio);

        let vendors = paginate_results(vendors, request.page, request.limit);
        let venues = paginate_results(venues, request.page, request.limit);

        let elapsed = started.elapsed().as_secs_f64() * 1000.0;
        info!(
            intent = ?sq.intent,
            vendors = vendors.total_results,
            venues = venues.total_results,
            elapsed_ms = elapsed,
            "search served"
        );

        SearchResponse {
            pagination: Pagination {
                page: vendors.page,
                limit: vendors.limit,
                total_vendor_results: vendors.total_results,
                total_venue_results: venues.total_results,
                total_pages_vendors: vendors.total_pages,
                total_pages_venues: venues.total_pages,
            },
            vendors: vendors.data,
            venues: venues.data,
            structured_query: QueryEcho::Parsed(sq),
            execution_time_ms: (elapsed * 100.0).round() / 100.0,
        }
    }

    /// Runs the hard filter for every catalog the intent covers. Hybrid
    /// fetches run side by side on the blocking pool.
    async fn fetch(&self, sq: &StructuredQuery) -> (Vec<VendorCandidate>, Vec<VenueCandidate>) {
        let vendors = async {
            if !sq.intent.includes_vendors() {
                return Vec::new();
            }
            let (db, sq, limit) = (self.db.clone(), sq.clone(), self.candidate_limit);
            blocking(move || hard_filter::fetch_vendors(&db, &sq, limit))
                .await
                .into_rows("vendors")
        };
        let venues = async {
            if !sq.intent.includes_venues() {
                return Vec::new();
            }
            let (db, sq, limit) = (self.db.clone(), sq.clone(), self.candidate_limit);
            blocking(move || hard_filter::fetch_venues(&db, &sq, limit))
                .await
                .into_rows("venues")
        };
        tokio::join!(vendors, venues)
    }
}

async fn blocking<T, F>(fetch: F) -> Fetch<T>
where
    F: FnOnce() -> Fetch<T> + Send + 'static,
    T: Send + 'static,
{
    match task::spawn_blocking(fetch).await {
        Ok(fetch) => fetch,
        Err(e) => Fetch::Failed(e.into()),
    }
}
