mod database;
mod import;
mod search;
mod settings;
mod web;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    database::Database,
    search::{ChatEnricher, Enricher, SearchEngine},
    settings::{Args, Settings},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let settings = Settings::from_file(args.config.as_deref()).context("cannot load settings")?;

    let db = Database::connect(&settings.database.path)?;
    if let Some(catalog) = args.import.as_deref() {
        import::import_catalog(&db, catalog)?;
    }

    let enricher = ChatEnricher::from_settings(&settings.enrichment)?
        .map(|enricher| Arc::new(enricher) as Arc<dyn Enricher>);
    info!(
        enrichment = enricher.is_some(),
        db = %settings.database.path.display(),
        "marketplace search server starting"
    );

    let engine = Arc::new(SearchEngine::new(db, enricher, &settings));
    web::serve(engine, settings.web.address).await;
    Ok(())
}
