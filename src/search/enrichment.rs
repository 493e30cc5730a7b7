use std::{fmt, time::Duration};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use super::{extractor::HardFilters, structured_query::EnrichedFields};
use crate::settings::EnrichmentSettings;

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A text-to-fields oracle consulted after extraction.
#[async_trait]
pub(crate) trait Enricher: Send + Sync {
    async fn enrich(&self, raw_query: &str, hard: &HardFilters) -> Result<EnrichedFields>;
}

/// Outcome of the enrichment stage.
#[derive(Debug)]
pub(crate) enum Enrichment {
    Applied(EnrichedFields),
    Skipped(SkipReason),
}

#[derive(Debug)]
pub(crate) enum SkipReason {
    Disabled,
    TimedOut(Duration),
    Failed(anyhow::Error),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled => write!(f, "enrichment disabled"),
            SkipReason::TimedOut(after) => write!(f, "enrichment timed out after {after:?}"),
            SkipReason::Failed(e) => write!(f, "enrichment failed: {e:#}"),
        }
    }
}

/// Consults `enricher` under `timeout`. Never fails; every problem becomes
/// a [`SkipReason`].
pub(crate) async fn enrich(
    enricher: Option<&dyn Enricher>,
    raw_query: &str,
    hard: &HardFilters,
    timeout: Duration,
) -> Enrichment {
    let Some(enricher) = enricher else {
        return Enrichment::Skipped(SkipReason::Disabled);
    };
    match tokio::time::timeout(timeout, enricher.enrich(raw_query, hard)).await {
        Ok(Ok(fields)) => Enrichment::Applied(fields),
        Ok(Err(e)) => Enrichment::Skipped(SkipReason::Failed(e)),
        Err(_) => Enrichment::Skipped(SkipReason::TimedOut(timeout)),
    }
}

/// Enrichment through an OpenAI-compatible chat-completions endpoint in
/// JSON mode.
pub(crate) struct ChatEnricher {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl ChatEnricher {
    /// `Ok(None)` when enrichment is switched off or no API key is set;
    /// the service then runs on extraction alone.
    pub(crate) fn from_settings(settings: &EnrichmentSettings) -> Result<Option<Self>> {
        Self::build(
            settings,
            settings.is_enabled(),
            std::env::var(&settings.api_key_env).ok(),
        )
    }

    fn build(
        settings: &EnrichmentSettings,
        enabled: bool,
        api_key: Option<String>,
    ) -> Result<Option<Self>> {
        if !enabled {
            return Ok(None);
        }
        let Some(api_key) = api_key else {
            warn!("{} not found. Enrichment disabled.", settings.api_key_env);
            return Ok(None);
        };
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(settings.timeout())
            .build()?;
        Ok(Some(Self {
            client,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_key,
            temperature: settings.temperature,
        }))
    }
}

#[async_trait]
impl Enricher for ChatEnricher {
    async fn enrich(&self, raw_query: &str, hard: &HardFilters) -> Result<EnrichedFields> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt(raw_query, hard)?},
            ],
        });
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("enrichment request failed")?
            .error_for_status()?
            .text()
            .await?;
        debug!(raw_response = %resp, "enrichment response");
        parse_completion(&resp)
    }
}

const SYSTEM_PROMPT: &str = "You are a strict JSON generator for search query enrichment \
    in a wedding marketplace of vendors and venues. Respond with a single JSON object only.";

fn user_prompt(raw_query: &str, hard: &HardFilters) -> Result<String> {
    let extracted = serde_json::to_string_pretty(hard)?;
    Ok(format!(
        r#"USER QUERY:
"{raw_query}"

FILTERS ALREADY EXTRACTED BY PATTERN MATCHING:
{extracted}

Tasks:
1. Check the extracted budget, experience, working_since and pincode. Fill any
   the patterns missed, for example "in market from 2000" means working_since 2000.
2. Extract geography explicitly present in the query: city, state, locality.
   Use null when the query does not mention one; never guess.
3. Extract the vendor or venue name if one is mentioned, correcting obvious
   misspellings only when the intent is clear ("Biteh" -> "Bite").
4. Add short semantic tags describing the style or kind of service wanted.

Geography precedence: pincode > locality > city > state.
Examples: "vendors in meerut uttar pradesh" -> city "Meerut", state "Uttar Pradesh";
"vendor in 245368" -> pincode "245368"; "vendors in NH2" -> locality "NH2".

Return exactly this JSON shape:
{{
  "entity_name": string or null,
  "min_experience": number or null,
  "budget_max": number or null,
  "working_since": number or null,
  "city": string or null,
  "state": string or null,
  "locality": string or null,
  "pincode": string or null,
  "category": string or null,
  "style": string or null,
  "semantic_tags": [string],
  "confidence": number
}}"#
    ))
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

fn parse_completion(body: &str) -> Result<EnrichedFields> {
    let completion: ChatCompletion =
        serde_json::from_str(body).context("malformed chat completion")?;
    let Some(content) = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
    else {
        bail!("chat completion has no content");
    };
    let output: JsonValue = serde_json::from_str(extract_json_object(&content))
        .context("model output is not valid JSON")?;
    if !output.is_object() {
        bail!("model output is not a JSON object");
    }
    serde_json::from_value(output).context("model output has an unexpected shape")
}

/// Strips prose or code fences around the first `{ ... }` block.
fn extract_json_object(response: &str) -> &str {
    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end > start {
                return &response[start..=end];
            }
        }
    }
    response
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use warp::Filter;

    use super::*;

    /// Returns canned fields, or an error when constructed with `None`.
    pub(crate) struct StubEnricher {
        pub(crate) fields: Option<EnrichedFields>,
        pub(crate) delay: Duration,
        pub(crate) calls: AtomicUsize,
    }

    impl StubEnricher {
        pub(crate) fn returning(fields: EnrichedFields) -> Self {
            Self {
                fields: Some(fields),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                fields: None,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Enricher for StubEnricher {
        async fn enrich(&self, _raw_query: &str, _hard: &HardFilters) -> Result<EnrichedFields> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match &self.fields {
                Some(fields) => Ok(fields.clone()),
                None => bail!("oracle unreachable"),
            }
        }
    }

    fn completion(content: &str) -> String {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
    }

    #[tokio::test]
    async fn missing_enricher_is_disabled() {
        let outcome = enrich(None, "djs", &HardFilters::default(), Duration::from_secs(1)).await;
        assert!(matches!(outcome, Enrichment::Skipped(SkipReason::Disabled)));
    }

    #[tokio::test]
    async fn failure_becomes_skip_reason() {
        let stub = StubEnricher::failing();
        let outcome = enrich(
            Some(&stub),
            "djs",
            &HardFilters::default(),
            Duration::from_secs(1),
        )
        .await;
        match outcome {
            Enrichment::Skipped(reason @ SkipReason::Failed(_)) => {
                assert!(reason.to_string().contains("oracle unreachable"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_oracle_times_out() {
        let stub = StubEnricher {
            delay: Duration::from_millis(200),
            ..StubEnricher::returning(EnrichedFields::default())
        };
        let outcome = enrich(
            Some(&stub),
            "djs",
            &HardFilters::default(),
            Duration::from_millis(20),
        )
        .await;
        assert!(matches!(outcome, Enrichment::Skipped(SkipReason::TimedOut(_))));
    }

    #[test]
    fn completion_content_is_parsed() {
        let content = "```json\n{\"city\": \"Meerut\", \"semantic_tags\": [\"royal\"]}\n```";
        let body = completion(content);
        let fields = parse_completion(&body).unwrap();
        assert_eq!(fields.city.as_deref(), Some("Meerut"));
        assert_eq!(fields.semantic_tags, ["royal"]);
    }

    #[test]
    fn malformed_completions_are_errors() {
        assert!(parse_completion("not json").is_err());
        assert!(parse_completion(r#"{"choices": []}"#).is_err());
        assert!(parse_completion(&completion("no object here")).is_err());
        assert!(parse_completion(&completion("42")).is_err());
    }

    #[test]
    fn positional_output_is_rejected() {
        let body = completion(r#"[5, 200000, 2010, "110001", "Delhi"]"#);
        assert!(parse_completion(&body).is_err());
    }

    #[test]
    fn prompt_carries_query_and_filters() {
        let hard = HardFilters {
            budget_max: Some(50_000),
            ..Default::default()
        };
        let prompt = user_prompt("venues under 50k", &hard).unwrap();
        assert!(prompt.contains("\"venues under 50k\""));
        assert!(prompt.contains("\"budget_max\": 50000"));
    }

    #[tokio::test]
    async fn chat_enricher_round_trip() {
        let route = warp::post()
            .and(warp::path("chat"))
            .and(warp::header::<String>("authorization"))
            .and(warp::body::json())
            .map(|auth: String, body: serde_json::Value| {
                assert_eq!(auth, "Bearer test-key");
                assert_eq!(body["model"], "test-model");
                let content = json!({"state": "Uttar Pradesh", "budget_max": "75000"});
                warp::reply::json(&json!({
                    "choices": [{"message": {"content": content.to_string()}}]
                }))
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let enricher = ChatEnricher {
            client: Client::new(),
            endpoint: format!("http://{addr}/chat"),
            model: "test-model".to_string(),
            api_key: "test-key".to_string(),
            temperature: 0.1,
        };
        let fields = enricher
            .enrich("vendors in up", &HardFilters::default())
            .await
            .unwrap();
        assert_eq!(fields.state.as_deref(), Some("Uttar Pradesh"));
        assert_eq!(fields.budget_max, Some(75_000));
    }

    fn settings() -> EnrichmentSettings {
        EnrichmentSettings {
            enabled: true,
            endpoint: "http://127.0.0.1:1/chat".to_string(),
            model: "test-model".to_string(),
            api_key_env: "MARKETPLACE_SEARCH_TEST_KEY".to_string(),
            temperature: 0.2,
            timeout_ms: 10,
        }
    }

    #[test]
    fn switched_off_builds_nothing() {
        let built = ChatEnricher::build(&settings(), false, Some("key".to_string())).unwrap();
        assert!(built.is_none());
    }

    #[test]
    fn missing_api_key_builds_nothing() {
        assert!(ChatEnricher::build(&settings(), true, None).unwrap().is_none());
    }

    #[test]
    fn enabled_with_key_builds_client() {
        let enricher = ChatEnricher::build(&settings(), true, Some("key".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(enricher.api_key, "key");
        assert_eq!(enricher.model, "test-model");
        assert_eq!(enricher.endpoint, "http://127.0.0.1:1/chat");
    }
}
