// Copyright 2025 DQGraph Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Natural-language to SPARQL translation.
//!
//! A fixed system instruction plus the user's question go to the
//! completion provider; one SPARQL query is extracted from whatever
//! text comes back. Only a rate-limit signal is retried, with doubling
//! backoff, up to three attempts total; every other failure propagates
//! immediately.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::warn;

use dqgraph_core::{sparql::extract_sparql, DqError};

use crate::config::LlmConfig;

/// Fixed instruction describing the rule graph's data model.
pub const SYSTEM_PROMPT: &str = r#"You translate natural-language questions about data-quality scores
into SPARQL 1.1 SELECT queries for GraphDB.

Use these prefixes exactly:
PREFIX ex: <http://example.org/>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>

Data model:
- ex:DQRule is the class for rules.
- Properties: ex:ruleCode, ex:score (xsd:decimal), ex:techSystem (database),
  ex:techGroup (schema), ex:dataset (table), ex:dataElement (field).
- For numeric comparisons/aggregates, cast scores with xsd:decimal.

Return ONLY one SPARQL query inside a single fenced code block:
```sparql
...query...
```"#;

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Provider-side failure, split so the translator can decide whether
/// an attempt remains worth retrying.
#[derive(Debug, Clone)]
pub enum CompletionError {
    /// HTTP 429-equivalent from the provider.
    RateLimited,
    /// Anything else; never retried.
    Failed(String),
}

/// Text-completion capability: system instructions plus a user input,
/// free-form text back.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, instructions: &str, input: &str) -> Result<String, CompletionError>;
}

/// Provider speaking the OpenAI-compatible chat-completions protocol.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, instructions: &str, input: &str) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CompletionError::Failed("no provider API key configured".into()))?;

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": instructions},
                {"role": "user", "content": input},
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Failed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CompletionError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Failed(format!(
                "provider returned {status}: {body}"
            )));
        }

        let envelope: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Failed(e.to_string()))?;
        Ok(envelope["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

/// Turns a question into a SPARQL query via the configured provider.
pub struct Translator {
    provider: Arc<dyn CompletionProvider>,
}

impl Translator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Translate a non-empty question into one SPARQL query.
    ///
    /// Up to three attempts; only a rate-limit signal is retried,
    /// sleeping 1 s then 2 s between attempts.
    pub async fn translate(&self, question: &str) -> Result<String, DqError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DqError::InvalidInput("question must not be empty".into()));
        }

        for attempt in 0..MAX_ATTEMPTS {
            match self.provider.complete(SYSTEM_PROMPT, question).await {
                Ok(text) => return Ok(extract_sparql(&text)),
                Err(CompletionError::RateLimited) if attempt + 1 < MAX_ATTEMPTS => {
                    let delay = BASE_BACKOFF * 2u32.pow(attempt);
                    warn!(attempt = attempt + 1, ?delay, "provider rate-limited, backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(CompletionError::RateLimited) => {
                    return Err(DqError::Provider(format!(
                        "rate-limited after {MAX_ATTEMPTS} attempts"
                    )));
                }
                Err(CompletionError::Failed(message)) => {
                    return Err(DqError::Provider(message));
                }
            }
        }
        unreachable!("loop returns on the final attempt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ScriptedProvider {
        rate_limits_before_success: u32,
        fail_with: Option<String>,
        response: String,
        attempts: AtomicU32,
    }

    impl ScriptedProvider {
        fn rate_limited_times(n: u32, response: &str) -> Self {
            Self {
                rate_limits_before_success: n,
                fail_with: None,
                response: response.to_string(),
                attempts: AtomicU32::new(0),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                rate_limits_before_success: 0,
                fail_with: Some(message.to_string()),
                response: String::new(),
                attempts: AtomicU32::new(0),
            }
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(&self, _sys: &str, _input: &str) -> Result<String, CompletionError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = &self.fail_with {
                return Err(CompletionError::Failed(message.clone()));
            }
            if attempt < self.rate_limits_before_success {
                return Err(CompletionError::RateLimited);
            }
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn extracts_query_from_fenced_response() {
        let provider = Arc::new(ScriptedProvider::rate_limited_times(
            0,
            "Sure:\n```sparql\nSELECT ?s WHERE { ?s ?p ?o }\n```",
        ));
        let translator = Translator::new(provider);
        let query = translator.translate("worst database?").await.unwrap();
        assert_eq!(query, "SELECT ?s WHERE { ?s ?p ?o }");
    }

    #[tokio::test]
    async fn empty_question_is_invalid_input() {
        let provider = Arc::new(ScriptedProvider::rate_limited_times(0, ""));
        let translator = Translator::new(provider.clone());
        match translator.translate("   ").await {
            Err(DqError::InvalidInput(_)) => {}
            other => panic!("expected InvalidInput, got {other:?}"),
        }
        assert_eq!(provider.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_one_rate_limit() {
        let provider = Arc::new(ScriptedProvider::rate_limited_times(1, "SELECT ?s"));
        let translator = Translator::new(provider.clone());
        let start = tokio::time::Instant::now();
        let query = translator.translate("q").await.unwrap();
        assert_eq!(query, "SELECT ?s");
        assert_eq!(provider.attempts(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn three_rate_limits_exhaust_retries_after_doubling_backoff() {
        let provider = Arc::new(ScriptedProvider::rate_limited_times(3, "unreached"));
        let translator = Translator::new(provider.clone());
        let start = tokio::time::Instant::now();
        match translator.translate("q").await {
            Err(DqError::Provider(message)) => assert!(message.contains("rate-limited")),
            other => panic!("expected Provider error, got {other:?}"),
        }
        assert_eq!(provider.attempts(), 3);
        // 1 s after the first attempt, 2 s after the second.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn non_rate_limit_failure_propagates_without_retry() {
        let provider = Arc::new(ScriptedProvider::failing("model unavailable"));
        let translator = Translator::new(provider.clone());
        match translator.translate("q").await {
            Err(DqError::Provider(message)) => assert_eq!(message, "model unavailable"),
            other => panic!("expected Provider error, got {other:?}"),
        }
        assert_eq!(provider.attempts(), 1);
    }
}
