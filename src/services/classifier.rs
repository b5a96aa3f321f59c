// Zero-Shot Classifier Client
// Wraps the hosted zero-shot classification API behind a timeout/retry policy

use crate::models::ClassificationOutcome;
use crate::services::ConfigStore;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_CLASSIFIER_URL: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-mnli";
const HYPOTHESIS_TEMPLATE: &str = "This document is {}.";

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("classifier request timed out after {0}s")]
    Timeout(u64),
    #[error("transient classifier failure: {status} - {message}")]
    Transient { status: u16, message: String },
    #[error("classifier rejected request: {status} - {message}")]
    Permanent { status: u16, message: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed classifier response: {0}")]
    Malformed(String),
}

impl ClassifierError {
    /// Transient failures are worth another attempt; everything else is not.
    pub fn is_transient(&self) -> bool {
        match self {
            ClassifierError::Timeout(_) | ClassifierError::Transient { .. } => true,
            ClassifierError::Http(e) => e.is_timeout() || e.is_connect(),
            ClassifierError::Permanent { .. } | ClassifierError::Malformed(_) => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierOptions {
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts (initial + retries).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Base backoff; doubles per attempt.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Input limit of the hosted model, in characters.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

/// The label distribution returned by one successful classifier call.
#[derive(Debug, Clone)]
pub struct LabelScores {
    pub scores: HashMap<String, f64>,
    pub top_label: String,
    pub top_score: f64,
}

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
    hypothesis_template: &'a str,
}

#[derive(Debug, Deserialize)]
struct ZeroShotResponse {
    labels: Vec<String>,
    scores: Vec<f64>,
}

/// Explicitly constructed client for the external zero-shot classifier.
/// Stateless across invocations; inject one per pipeline instead of
/// reaching for an ambient singleton.
pub struct ZeroShotClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    options: ClassifierOptions,
}

impl ZeroShotClient {
    pub fn new(base_url: &str, api_key: Option<String>, options: ClassifierOptions) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            options,
        }
    }

    /// Build a client from environment variables, falling back to the
    /// default config file for the URL, options and API key.
    pub fn from_env() -> Self {
        match ConfigStore::default_config_dir() {
            Some(dir) => Self::from_config(&ConfigStore::new(dir)),
            None => {
                let base_url = env_classifier_url()
                    .unwrap_or_else(|| DEFAULT_CLASSIFIER_URL.to_string());
                Self::new(&base_url, api_key_from_env(), ClassifierOptions::default())
            }
        }
    }

    /// Build a client against a specific config store. Environment variables
    /// take precedence over stored values, same as for API keys.
    pub fn from_config(store: &ConfigStore) -> Self {
        let base_url = env_classifier_url()
            .or_else(|| store.get_classifier_url().ok().flatten())
            .unwrap_or_else(|| DEFAULT_CLASSIFIER_URL.to_string());
        let options = store
            .load()
            .map(|config| config.classifier.options)
            .unwrap_or_default();
        let api_key = api_key_from_env()
            .or_else(|| store.get_api_key("huggingface").ok().flatten());

        Self::new(&base_url, api_key, options)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    /// One classification attempt, no retry.
    async fn classify_once(
        &self,
        text: &str,
        candidate_labels: &[String],
    ) -> Result<LabelScores, ClassifierError> {
        let request = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels,
                hypothesis_template: HYPOTHESIS_TEMPLATE,
            },
        };

        let mut builder = self.client.post(&self.base_url).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = if status.as_u16() == 429 || status.is_server_error() {
                ClassifierError::Transient {
                    status: status.as_u16(),
                    message: body,
                }
            } else {
                ClassifierError::Permanent {
                    status: status.as_u16(),
                    message: body,
                }
            };
            return Err(err);
        }

        let data: ZeroShotResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        if data.labels.is_empty() || data.labels.len() != data.scores.len() {
            return Err(ClassifierError::Malformed(
                "label/score arrays missing or mismatched".to_string(),
            ));
        }

        let top_label = data.labels[0].clone();
        let top_score = data.scores[0];
        let scores: HashMap<String, f64> =
            data.labels.into_iter().zip(data.scores).collect();

        Ok(LabelScores {
            scores,
            top_label,
            top_score,
        })
    }

    /// Classify with bounded retry and exponential backoff. Retries only on
    /// transient failures; permanent rejections surface immediately. Total
    /// wall clock is bounded by attempts x (timeout + backoff) regardless of
    /// outer cancellation.
    pub async fn classify(
        &self,
        text: &str,
        candidate_labels: &[String],
    ) -> Result<LabelScores, ClassifierError> {
        let started = Instant::now();
        let mut last_err: Option<ClassifierError> = None;

        for attempt in 1..=self.options.max_attempts {
            let timeout = Duration::from_secs(self.options.timeout_secs);
            let result = tokio::time::timeout(timeout, self.classify_once(text, candidate_labels))
                .await
                .unwrap_or(Err(ClassifierError::Timeout(self.options.timeout_secs)));

            match result {
                Ok(scores) => {
                    info!(
                        "[CLASSIFIER] ok label={} attempt={} elapsed_ms={}",
                        scores.top_label,
                        attempt,
                        started.elapsed().as_millis()
                    );
                    return Ok(scores);
                }
                Err(e) if e.is_transient() && attempt < self.options.max_attempts => {
                    warn!("[CLASSIFIER] transient failure attempt={} : {}", attempt, e);
                    let backoff = self.options.backoff_ms.saturating_mul(1 << (attempt - 1));
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    last_err = Some(e);
                }
                Err(e) => {
                    warn!("[CLASSIFIER] giving up attempt={} : {}", attempt, e);
                    return Err(e);
                }
            }
        }

        Err(last_err.unwrap_or(ClassifierError::Timeout(self.options.timeout_secs)))
    }
}

/// Seam between the pipeline and the external model, so tests can drive the
/// pipeline with stubs.
pub trait SectionClassifier: Send + Sync {
    /// Classify one section. Never fails past this boundary: permanent
    /// failures become a `Failed` outcome so the aggregator always receives
    /// a well-formed result.
    fn classify_section(
        &self,
        text: &str,
        candidate_labels: &[String],
    ) -> impl Future<Output = ClassificationOutcome> + Send;
}

impl SectionClassifier for ZeroShotClient {
    async fn classify_section(
        &self,
        text: &str,
        candidate_labels: &[String],
    ) -> ClassificationOutcome {
        let (input, truncated) = truncate_chars(text, self.options.max_input_chars);
        if truncated {
            warn!(
                "[CLASSIFIER] input truncated from {} to {} chars",
                text.chars().count(),
                self.options.max_input_chars
            );
        }

        match self.classify(input, candidate_labels).await {
            Ok(result) => ClassificationOutcome::Classified {
                label: result.top_label,
                confidence: result.top_score,
                scores: result.scores,
                truncated,
            },
            Err(e) => ClassificationOutcome::Failed {
                reason: e.to_string(),
                truncated,
            },
        }
    }
}

/// Truncate to at most `max_chars` characters, on a UTF-8 boundary.
fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

/// Get classifier API key from environment or the default config file.
pub fn get_api_key() -> Option<String> {
    if let Some(key) = api_key_from_env() {
        return Some(key);
    }

    if let Some(config_dir) = ConfigStore::default_config_dir() {
        let store = ConfigStore::new(config_dir);
        if let Ok(Some(key)) = store.get_api_key("huggingface") {
            return Some(key);
        }
    }

    None
}

fn api_key_from_env() -> Option<String> {
    for key in ["HF_API_TOKEN", "COMPLISCAN_API_TOKEN"] {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }
    None
}

fn env_classifier_url() -> Option<String> {
    env::var("COMPLISCAN_CLASSIFIER_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
}

// ============ Default Value Functions ============

fn default_timeout_secs() -> u64 { 30 }
fn default_max_attempts() -> usize { 3 }
fn default_backoff_ms() -> u64 { 400 }
fn default_max_input_chars() -> usize { 2048 }
