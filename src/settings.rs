// src/settings.rs

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;
use config::{builder::DefaultState, ConfigBuilder, ConfigError, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const DEFAULT_ADDR: &str = "0.0.0.0:8050";
const DEFAULT_DB_DIR: &str = "marketplace-search";
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_TIMEOUT_MS: i64 = 8_000;
const DEFAULT_CANDIDATE_LIMIT: i64 = 200;
const DEFAULT_THRESHOLD_RATIO: f64 = 0.2;

/// Environment switch kept for deployments that only toggle enrichment
/// through the process environment.
pub(crate) const ENABLE_LLM_ENV: &str = "ENABLE_LLM";

#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// Path to the local configuration TOML file.
    #[arg(short, value_name = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Load vendors and venues from a JSON catalog before serving.
    #[arg(long, value_name = "CATALOG_PATH")]
    pub import: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Web {
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub address: SocketAddr,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentSettings {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_ms: u64,
}

impl EnrichmentSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Enabled either in the file or through `ENABLE_LLM=true`.
    pub fn is_enabled(&self) -> bool {
        self.enabled || switch_on(std::env::var(ENABLE_LLM_ENV).ok().as_deref())
    }
}

fn switch_on(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Row cap applied to every storage fetch.
    pub candidate_limit: usize,
    /// Default strict-filter ratio when a request does not carry one.
    pub threshold_ratio: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub web: Web,
    pub database: DatabaseSettings,
    pub enrichment: EnrichmentSettings,
    pub search: SearchSettings,
}

impl Settings {
    /// Load settings from the given TOML file, with sane defaults.
    pub fn from_file(path: Option<&Path>) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::<DefaultState>::default()
            .set_default("web.address", DEFAULT_ADDR)?
            .set_default("database.path", default_db_path())?
            .set_default("enrichment.enabled", false)?
            .set_default("enrichment.endpoint", DEFAULT_ENDPOINT)?
            .set_default("enrichment.model", DEFAULT_MODEL)?
            .set_default("enrichment.api_key_env", DEFAULT_API_KEY_ENV)?
            .set_default("enrichment.temperature", 0.1)?
            .set_default("enrichment.timeout_ms", DEFAULT_TIMEOUT_MS)?
            .set_default("search.candidate_limit", DEFAULT_CANDIDATE_LIMIT)?
            .set_default("search.threshold_ratio", DEFAULT_THRESHOLD_RATIO)?;

        let builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder,
        };

        builder.build()?.try_deserialize()
    }
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", DEFAULT_DB_DIR).map_or_else(
        || DEFAULT_DB_DIR.to_string(),
        |dirs| dirs.data_dir().to_string_lossy().into_owned(),
    )
}

fn deserialize_socket_addr<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}
