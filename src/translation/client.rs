//! Chat-completion client for the external translation model.
//!
//! One call, one response. Failures and timeouts surface as
//! `ExternalService` errors; nothing is retried here.

use super::metrics::TranslationMetrics;
use crate::error::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// OpenAI Chat Completion request
#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Token counts reported by the model for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone)]
pub struct ModelClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl ModelClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one system+user exchange and return the first choice.
    pub async fn complete(&self, system: &str, user: &str) -> CatalogResult<Completion> {
        let metrics = TranslationMetrics::global();
        match tokio::time::timeout(self.timeout, self.send(system, user)).await {
            Ok(Ok(completion)) => {
                metrics.record_tokens(
                    completion.usage.prompt_tokens,
                    completion.usage.completion_tokens,
                );
                Ok(completion)
            }
            Ok(Err(e)) => {
                metrics.record_api_failure();
                warn!("Translation model call failed: {}", e);
                Err(e)
            }
            Err(_) => {
                metrics.record_timeout();
                warn!(
                    "Translation model call timed out after {}s",
                    self.timeout.as_secs_f32()
                );
                Err(CatalogError::ExternalService(format!(
                    "translation model did not answer within {}s",
                    self.timeout.as_secs_f32()
                )))
            }
        }
    }

    async fn send(&self, system: &str, user: &str) -> CatalogResult<Completion> {
        // Reasoning models need higher token limits and don't support temperature
        let is_reasoning = is_reasoning_model(&self.model);
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_completion_tokens: if is_reasoning {
                self.max_tokens.max(16000)
            } else {
                self.max_tokens
            },
            temperature: if is_reasoning { None } else { Some(0.3) },
            reasoning_effort: if is_reasoning {
                Some("low".to_string())
            } else {
                None
            },
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CatalogError::ExternalService(format!("failed to reach translation model: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(CatalogError::ExternalService(format!(
                "translation model returned {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            CatalogError::ExternalService(format!("unreadable translation model response: {}", e))
        })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                CatalogError::ExternalService(
                    "translation model response contained no choices".to_string(),
                )
            })?;

        let usage = chat.usage.unwrap_or_default();
        debug!(
            "Model answered with {} chars ({} prompt / {} completion tokens)",
            content.len(),
            usage.prompt_tokens,
            usage.completion_tokens
        );
        Ok(Completion { content, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, model: &str, timeout: Duration) -> ModelClient {
        ModelClient::new(
            format!("{}/v1/chat/completions", server.uri()),
            "sk-test",
            model,
            4000,
            timeout,
        )
    }

    fn chat_body(content: &str) -> serde_json::Value {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
        })
    }

    #[test]
    fn test_is_reasoning_model() {
        assert!(is_reasoning_model("gpt-5-mini"));
        assert!(is_reasoning_model("o3-mini"));
        assert!(!is_reasoning_model("gpt-4o-mini"));
    }

    #[tokio::test]
    #[serial]
    async fn test_complete_returns_content_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("1. Hola")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "gpt-4o-mini", Duration::from_secs(5));
        let completion = client.complete("system", "1. Hello").await.unwrap();

        assert_eq!(completion.content, "1. Hola");
        assert_eq!(completion.usage.prompt_tokens, 120);
        assert_eq!(completion.usage.total(), 150);
    }

    #[tokio::test]
    #[serial]
    async fn test_reasoning_model_omits_temperature() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"reasoning_effort": "low", "max_completion_tokens": 16000})))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("1. Hola")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "o3-mini", Duration::from_secs(5));
        assert!(client.complete("system", "user").await.is_ok());
    }

    #[tokio::test]
    #[serial]
    async fn test_http_error_is_external_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "gpt-4o-mini", Duration::from_secs(5));
        let err = client.complete("system", "user").await.unwrap_err();
        assert!(matches!(err, CatalogError::ExternalService(ref m) if m.contains("upstream down")));
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_usage_defaults_to_zero() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "1. Hola"}}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, "gpt-4o-mini", Duration::from_secs(5));
        let completion = client.complete("system", "user").await.unwrap();
        assert_eq!(completion.usage, TokenUsage::default());
    }

    #[tokio::test]
    #[serial]
    async fn test_no_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = client_for(&server, "gpt-4o-mini", Duration::from_secs(5));
        assert!(client.complete("system", "user").await.is_err());
    }

    #[tokio::test]
    #[serial]
    async fn test_slow_model_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_body("1. Hola"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, "gpt-4o-mini", Duration::from_millis(50));
        let err = client.complete("system", "user").await.unwrap_err();
        assert!(matches!(err, CatalogError::ExternalService(ref m) if m.contains("did not answer")));
    }
}
