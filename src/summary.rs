//! Natural-language summaries of a unified diff.
//!
//! Summaries come from an external chat-completion service and are best-effort:
//! [`summarize_or_fallback`] never fails. An empty diff short-circuits to
//! [`NO_DIFFERENCES`] without calling the service, and any service error is turned
//! into a `"Summary error: ..."` string.
//!
//! The HTTP client ([`ChatSummarizer`]) is an ordinary value built from a
//! [`SummarizerConfig`]; anything implementing [`Summarizer`] can stand in for it.
//!
//! ## Environment Variables
//!
//! [`SummarizerConfig::from_env`] reads:
//!
//! - `HUGGINGFACE_API_KEY` - Bearer token for the endpoint
//! - `DOCDIFF_SUMMARY_ENDPOINT` - Chat-completions URL
//! - `DOCDIFF_SUMMARY_MODEL` - Model identifier
//! - `DOCDIFF_SUMMARY_MAX_TOKENS` - Completion length limit

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use ureq::Agent;
use ureq::tls::{RootCerts, TlsConfig, TlsProvider};

/// Returned for an empty diff.
pub const NO_DIFFERENCES: &str = "No differences found.";

pub const DEFAULT_ENDPOINT: &str = "https://router.huggingface.co/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-72B-Instruct";
pub const DEFAULT_MAX_TOKENS: u32 = 250;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum accepted response body (1 MB).
const MAX_RESPONSE_SIZE: u64 = 1024 * 1024;

/// Produces a prose synopsis of a unified diff.
pub trait Summarizer: Sync {
    fn summarize(&self, diff_text: &str) -> Result<String, SummaryError>;
}

#[derive(Debug, Error)]
pub enum SummaryError {
    /// No API token was configured.
    #[error("no API token configured (set HUGGINGFACE_API_KEY)")]
    MissingToken,

    /// The request could not be completed or returned a non-success status.
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: ureq::Error,
    },

    /// The request or response body was not the expected JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The response parsed but held no message content.
    #[error("response contained no completion")]
    EmptyCompletion,
}

/// Connection settings for the chat-completion endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct SummarizerConfig {
    /// Chat-completions URL.
    pub endpoint: String,

    /// Bearer token; requests fail with [`SummaryError::MissingToken`] without one.
    pub token: Option<String>,

    /// Model identifier sent with each request.
    pub model: String,

    /// Upper bound on the completion length.
    pub max_tokens: u32,

    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for SummarizerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummarizerConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &redacted(self.token.as_ref()))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn redacted(token: Option<&String>) -> Option<&'static str> {
    token.map(|_| "<redacted>")
}

/// Partial settings laid over an environment-derived [`SummarizerConfig`].
///
/// Host bindings deserialize this from their options; unset fields keep the
/// base value.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SummarizerOverrides {
    /// Replaces [`SummarizerConfig::endpoint`].
    pub endpoint: Option<String>,
    /// Replaces [`SummarizerConfig::token`].
    pub token: Option<String>,
    /// Replaces [`SummarizerConfig::model`].
    pub model: Option<String>,
    /// Replaces [`SummarizerConfig::max_tokens`].
    pub max_tokens: Option<u32>,
    /// Replaces [`SummarizerConfig::timeout_secs`].
    pub timeout_secs: Option<u64>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for SummarizerOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummarizerOverrides")
            .field("endpoint", &self.endpoint)
            .field("token", &redacted(self.token.as_ref()))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SummarizerConfig {
    /// Builds a config from the process environment, defaults filling the gaps.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_tokens = match non_empty("DOCDIFF_SUMMARY_MAX_TOKENS") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!(
                    "Ignoring DOCDIFF_SUMMARY_MAX_TOKENS={raw:?}: not a number, using {}",
                    defaults.max_tokens
                );
                defaults.max_tokens
            }),
            None => defaults.max_tokens,
        };

        Self {
            endpoint: non_empty("DOCDIFF_SUMMARY_ENDPOINT").unwrap_or(defaults.endpoint),
            token: non_empty("HUGGINGFACE_API_KEY"),
            model: non_empty("DOCDIFF_SUMMARY_MODEL").unwrap_or(defaults.model),
            max_tokens,
            timeout_secs: defaults.timeout_secs,
        }
    }

    /// Replaces every field that `overrides` sets.
    #[must_use]
    pub fn with_overrides(mut self, overrides: SummarizerOverrides) -> Self {
        if let Some(endpoint) = overrides.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(token) = overrides.token {
            self.token = Some(token);
        }
        if let Some(model) = overrides.model {
            self.model = model;
        }
        if let Some(max_tokens) = overrides.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        self
    }
}

/// Embeds the diff in the instruction sent to the model.
#[must_use]
pub fn build_prompt(diff_text: &str) -> String {
    format!(
        "Analyze the differences below.\n\
         Format output as:\n\
         **Key Changes:**\n\
         * [Point 1]\n\
         **Tone:** [Analysis]\n\
         \n\
         DIFF:\n\
         {diff_text}\n"
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Extracts the first completion from a chat-completion response body.
pub fn parse_response(body: &[u8]) -> Result<String, SummaryError> {
    let response: ChatResponse = serde_json::from_slice(body)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(SummaryError::EmptyCompletion)
}

/// Summarizer backed by an OpenAI-compatible chat-completions endpoint.
pub struct ChatSummarizer {
    agent: Agent,
    config: SummarizerConfig,
}

impl ChatSummarizer {
    #[must_use]
    pub fn new(config: SummarizerConfig) -> Self {
        let tls_config = TlsConfig::builder()
            .provider(TlsProvider::NativeTls)
            .root_certs(RootCerts::PlatformVerifier)
            .build();

        let agent = Agent::config_builder()
            .tls_config(tls_config)
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Self { agent, config }
    }

    #[must_use]
    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Serialized request body for `diff_text`.
    fn request_body(&self, diff_text: &str) -> Result<Vec<u8>, SummaryError> {
        let prompt = build_prompt(diff_text);
        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: &prompt,
            }],
            max_tokens: self.config.max_tokens,
        };
        Ok(serde_json::to_vec(&request)?)
    }
}

impl Summarizer for ChatSummarizer {
    fn summarize(&self, diff_text: &str) -> Result<String, SummaryError> {
        let token = self.config.token.as_deref().ok_or(SummaryError::MissingToken)?;
        let body = self.request_body(diff_text)?;
        let http_error = |source| SummaryError::Http {
            endpoint: self.config.endpoint.clone(),
            source,
        };

        log::debug!(
            "Requesting summary from {} ({} bytes of diff)",
            self.config.endpoint,
            diff_text.len()
        );

        let bytes = self
            .agent
            .post(&self.config.endpoint)
            .header("Authorization", &format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .send(&body[..])
            .map_err(http_error)?
            .into_body()
            .with_config()
            .limit(MAX_RESPONSE_SIZE)
            .read_to_vec()
            .map_err(http_error)?;

        parse_response(&bytes)
    }
}

/// Summarizes `diff_text`, never failing.
///
/// Whitespace-only diffs return [`NO_DIFFERENCES`] without calling `summarizer`.
/// Errors are logged and replaced by a `"Summary error: ..."` message.
pub fn summarize_or_fallback(summarizer: &dyn Summarizer, diff_text: &str) -> String {
    if diff_text.trim().is_empty() {
        return NO_DIFFERENCES.to_string();
    }
    match summarizer.summarize(diff_text) {
        Ok(summary) => summary,
        Err(err) => {
            log::warn!("Summary unavailable: {err}");
            format!("Summary error: {err}")
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a canned reply and counts calls.
    pub(crate) struct FakeSummarizer {
        pub reply: Option<&'static str>,
        pub calls: AtomicUsize,
    }

    impl FakeSummarizer {
        pub(crate) fn replying(reply: &'static str) -> Self {
            Self {
                reply: Some(reply),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Summarizer for FakeSummarizer {
        fn summarize(&self, _diff_text: &str) -> Result<String, SummaryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .map(str::to_string)
                .ok_or(SummaryError::EmptyCompletion)
        }
    }

    #[test]
    fn empty_diff_skips_summarizer() {
        let fake = FakeSummarizer::replying("unused");
        assert_eq!(summarize_or_fallback(&fake, ""), NO_DIFFERENCES);
        assert_eq!(summarize_or_fallback(&fake, "  \n "), NO_DIFFERENCES);
        assert_eq!(fake.calls(), 0);
    }

    #[test]
    fn summary_is_passed_through() {
        let fake = FakeSummarizer::replying("**Key Changes:** one");
        assert_eq!(summarize_or_fallback(&fake, "-a\n+b"), "**Key Changes:** one");
        assert_eq!(fake.calls(), 1);
    }

    #[test]
    fn failure_becomes_error_message() {
        let fake = FakeSummarizer::failing();
        assert_eq!(
            summarize_or_fallback(&fake, "-a\n+b"),
            "Summary error: response contained no completion"
        );
    }

    #[test]
    fn missing_token_fails_without_request() {
        let summarizer = ChatSummarizer::new(SummarizerConfig::default());
        let err = summarizer.summarize("-a").unwrap_err();
        assert!(matches!(err, SummaryError::MissingToken));
    }

    #[test]
    fn prompt_embeds_diff() {
        let prompt = build_prompt("-old\n+new");
        assert!(prompt.starts_with("Analyze the differences below."));
        assert!(prompt.contains("**Key Changes:**"));
        assert!(prompt.contains("**Tone:**"));
        assert!(prompt.ends_with("DIFF:\n-old\n+new\n"));
    }

    #[test]
    fn request_body_shape() {
        let summarizer = ChatSummarizer::new(SummarizerConfig::default());
        let body = summarizer.request_body("-x").unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], build_prompt("-x"));
    }

    #[test]
    fn parse_response_takes_first_choice() {
        let body = br#"{"choices":[{"message":{"role":"assistant","content":"Short summary"}},
                                   {"message":{"content":"ignored"}}]}"#;
        assert_eq!(parse_response(body).unwrap(), "Short summary");
    }

    #[test]
    fn parse_response_rejects_empty_choices() {
        assert!(matches!(
            parse_response(br#"{"choices":[]}"#),
            Err(SummaryError::EmptyCompletion)
        ));
        assert!(matches!(
            parse_response(br#"{"choices":[{"message":{"content":null}}]}"#),
            Err(SummaryError::EmptyCompletion)
        ));
        assert!(matches!(
            parse_response(b"<html>502</html>"),
            Err(SummaryError::Json(_))
        ));
    }

    #[test]
    fn config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("HUGGINGFACE_API_KEY", "hf_secret"),
            ("DOCDIFF_SUMMARY_MODEL", "tiny-model"),
            ("DOCDIFF_SUMMARY_MAX_TOKENS", "99"),
            ("DOCDIFF_SUMMARY_ENDPOINT", " "),
        ]
        .into_iter()
        .collect();
        let config = SummarizerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.token.as_deref(), Some("hf_secret"));
        assert_eq!(config.model, "tiny-model");
        assert_eq!(config.max_tokens, 99);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn config_ignores_bad_max_tokens() {
        let config = SummarizerConfig::from_lookup(|k| {
            (k == "DOCDIFF_SUMMARY_MAX_TOKENS").then(|| "lots".to_string())
        });
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.token, None);
    }

    #[test]
    fn overrides_keep_unset_fields() {
        let vars: HashMap<&str, &str> = [
            ("HUGGINGFACE_API_KEY", "hf_env"),
            ("DOCDIFF_SUMMARY_ENDPOINT", "https://proxy.internal/v1/chat/completions"),
            ("DOCDIFF_SUMMARY_MAX_TOKENS", "120"),
        ]
        .into_iter()
        .collect();
        let overrides: SummarizerOverrides =
            serde_json::from_str(r#"{"model": "m", "timeout_secs": 5}"#).unwrap();
        let config = SummarizerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
            .with_overrides(overrides);

        assert_eq!(config.endpoint, "https://proxy.internal/v1/chat/completions");
        assert_eq!(config.token.as_deref(), Some("hf_env"));
        assert_eq!(config.model, "m");
        assert_eq!(config.max_tokens, 120);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn overrides_replace_token() {
        let config = SummarizerConfig::default().with_overrides(SummarizerOverrides {
            token: Some("hf_opts".to_string()),
            ..Default::default()
        });
        assert_eq!(config.token.as_deref(), Some("hf_opts"));
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn debug_output_hides_token() {
        let config = SummarizerConfig {
            token: Some("hf_secret".to_string()),
            ..SummarizerConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hf_secret"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains(DEFAULT_MODEL));

        let overrides = SummarizerOverrides {
            token: Some("hf_secret".to_string()),
            ..Default::default()
        };
        assert!(!format!("{overrides:?}").contains("hf_secret"));
    }
}
