use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use serde_json::json;
use tracing::{info, warn};
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use crate::search::{SearchEngine, SearchRequest};

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Runs the HTTP API until the process is stopped.
pub(crate) async fn serve(engine: Arc<SearchEngine>, addr: SocketAddr) {
    info!("listening on {addr}");
    warp::serve(routes(engine)).run(addr).await;
}

fn routes(
    engine: Arc<SearchEngine>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let search_route = warp::path!("api" / "v1" / "search")
        .and(warp::post())
        .and(with_engine(engine.clone()))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .then(search);

    let health_route = warp::path!("api" / "v1" / "db-health")
        .and(warp::get())
        .and(with_engine(engine))
        .map(|engine: Arc<SearchEngine>| health_reply(engine.database().ping()));

    search_route.or(health_route)
}

fn with_engine(
    engine: Arc<SearchEngine>,
) -> impl Filter<Extract = (Arc<SearchEngine>,), Error = Infallible> + Clone {
    warp::any().map(move || engine.clone())
}

async fn search(engine: Arc<SearchEngine>, request: SearchRequest) -> reply::Json {
    reply::json(&engine.search(request).await)
}

fn health_reply(ping: anyhow::Result<()>) -> reply::WithStatus<reply::Json> {
    match ping {
        Ok(()) => reply::with_status(
            reply::json(&json!({"status": "Connection is healthy"})),
            StatusCode::OK,
        ),
        Err(e) => {
            warn!("database health check failed: {e:#}");
            reply::with_status(
                reply::json(&json!({"status": format!("Database unavailable: {e}")})),
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    }
}
