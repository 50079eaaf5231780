//! HTTP scoring oracle implementation
//!
//! Calls any OpenAI-compatible `/v1/chat/completions` endpoint and asks
//! the model to answer in a fixed line protocol:
//!
//! ```text
//! SCORE: <number 0-100>
//! RATIONALE: <one short paragraph>
//! RECOMMENDATION: <one sentence>
//! ```
//!
//! Configuration via the `oracle` config section or environment variables:
//! - `ORACLE_URL` (default: `http://localhost:11434/v1/chat/completions`)
//! - `ORACLE_MODEL` (default: `llama3.1`)
//! - `ORACLE_API_KEY` (optional, for hosted endpoints)
//! - `ORACLE_TIMEOUT_SECS` (default: `30`)

use super::traits::{MatchSignal, ScoringOracle};
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP-based scoring oracle using the OpenAI chat-completions API format.
///
/// Thread-safe and cheaply cloneable (shares the reqwest client internally).
#[derive(Clone)]
pub struct HttpScoringOracle {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl HttpScoringOracle {
    pub fn new(
        url: String,
        model: String,
        api_key: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            url,
            model,
            api_key,
        }
    }

    /// Create an oracle from environment variables (see module docs).
    pub fn from_env() -> Self {
        let url = std::env::var("ORACLE_URL")
            .unwrap_or_else(|_| "http://localhost:11434/v1/chat/completions".to_string());
        let model = std::env::var("ORACLE_MODEL").unwrap_or_else(|_| "llama3.1".to_string());
        let api_key = std::env::var("ORACLE_API_KEY").ok().filter(|k| !k.is_empty());
        let timeout_secs = std::env::var("ORACLE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok());
        Self::new(url, model, api_key, timeout_secs)
    }

    fn build_prompt(profile_text: &str, need_text: &str) -> String {
        format!(
            "You match fractional executives with startup roles. Compare the executive \
             profile below against the role and reply EXACTLY in this format with no \
             other text:\n\
             SCORE: <number 0-100>\n\
             RATIONALE: <one short paragraph>\n\
             RECOMMENDATION: <one sentence>\n\n\
             Executive profile:\n{}\n\n\
             Role:\n{}",
            profile_text, need_text
        )
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let mut req = self.client.post(&self.url).json(&request);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                MarketError::OracleUnavailable(format!("request failed: {}", e))
            } else {
                MarketError::Storage(anyhow::anyhow!("oracle request error: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Overload and server-side failures are retryable; anything
            // else is a misconfiguration.
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(MarketError::OracleUnavailable(format!(
                    "oracle returned {}",
                    status.as_u16()
                )));
            }
            return Err(MarketError::Storage(anyhow::anyhow!(
                "oracle rejected request ({}): {}",
                status.as_u16(),
                body
            )));
        }

        let resp: ChatResponse = response.json().await.map_err(|e| {
            MarketError::OracleUnavailable(format!("unreadable oracle response: {}", e))
        })?;

        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                MarketError::OracleUnavailable("oracle returned no choices".to_string())
            })
    }

    /// Parse the SCORE/RATIONALE/RECOMMENDATION line protocol. The model
    /// occasionally pads or rambles, so parsing is lenient about extra
    /// lines but strict about the SCORE line being present.
    fn parse_signal(completion: &str) -> Result<MatchSignal> {
        let mut score: Option<f64> = None;
        let mut rationale = String::new();
        let mut recommendation = String::new();

        for line in completion.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("SCORE:") {
                score = rest.trim().parse::<f64>().ok();
            } else if let Some(rest) = line.strip_prefix("RATIONALE:") {
                rationale = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("RECOMMENDATION:") {
                recommendation = rest.trim().to_string();
            }
        }

        let score = score.ok_or_else(|| {
            MarketError::OracleUnavailable("oracle response missing SCORE line".to_string())
        })?;

        Ok(MatchSignal {
            score: (score / 100.0).clamp(0.0, 1.0),
            rationale,
            recommendation,
        })
    }
}

#[async_trait]
impl ScoringOracle for HttpScoringOracle {
    async fn score(&self, profile_text: &str, need_text: &str) -> Result<MatchSignal> {
        let prompt = Self::build_prompt(profile_text, need_text);
        let completion = self.complete(prompt).await?;
        let signal = Self::parse_signal(&completion)?;
        tracing::debug!(
            model = %self.model,
            score = signal.score,
            "oracle scored candidate pair"
        );
        Ok(signal)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    async fn oracle_for(server: &MockServer) -> HttpScoringOracle {
        HttpScoringOracle::new(
            format!("{}/v1/chat/completions", server.uri()),
            "test-model".to_string(),
            None,
            Some(5),
        )
    }

    #[tokio::test]
    async fn test_score_parses_line_protocol() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                "SCORE: 85\nRATIONALE: Strong finance background.\nRECOMMENDATION: Interview soon.",
            )))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server).await;
        let signal = oracle.score("profile", "need").await.unwrap();
        assert!((signal.score - 0.85).abs() < 1e-9);
        assert_eq!(signal.rationale, "Strong finance background.");
        assert_eq!(signal.recommendation, "Interview soon.");
    }

    #[tokio::test]
    async fn test_score_clamps_out_of_range_values() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                "SCORE: 140\nRATIONALE: over-enthusiastic\nRECOMMENDATION: hire",
            )))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server).await;
        let signal = oracle.score("profile", "need").await.unwrap();
        assert_eq!(signal.score, 1.0);
    }

    #[tokio::test]
    async fn test_server_error_classifies_as_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server).await;
        let err = oracle.score("profile", "need").await.unwrap_err();
        assert!(matches!(err, MarketError::OracleUnavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_score_line_classifies_as_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("I think they would be a great fit!")),
            )
            .mount(&server)
            .await;

        let oracle = oracle_for(&server).await;
        let err = oracle.score("profile", "need").await.unwrap_err();
        assert!(matches!(err, MarketError::OracleUnavailable(_)));
    }

    #[test]
    fn test_parse_signal_tolerates_extra_lines() {
        let completion = "Sure, here is my assessment:\n\
                          SCORE: 42.5\n\
                          RATIONALE: Partial overlap.\n\
                          RECOMMENDATION: Consider for later stages.\n\
                          Let me know if you need more detail.";
        let signal = HttpScoringOracle::parse_signal(completion).unwrap();
        assert!((signal.score - 0.425).abs() < 1e-9);
        assert_eq!(signal.rationale, "Partial overlap.");
    }
}
