//! OpenRouter chat-completions client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, error, instrument};

use postcraft_shared::{OpenRouterConfig, PostcraftError, Result};

use crate::{TextGenerator, build_client, endpoint};

/// Non-streaming text generation through an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenRouterClient {
    /// Create a client for `model` using the endpoint and timeout from `config`.
    pub fn new(
        config: &OpenRouterConfig,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.base_url.clone(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    #[instrument(skip_all, fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str, instructions: &[&str]) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if !instructions.is_empty() {
            messages.push(json!({"role": "system", "content": instructions.join("\n")}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });

        let url = endpoint(&self.base_url, "chat/completions");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "Postcraft")
            .json(&body)
            .send()
            .await
            .map_err(|e| PostcraftError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(%status, "generation request failed");
            return Err(PostcraftError::Upstream(map_api_error(status, &text)));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| PostcraftError::parse(format!("invalid completion response: {e}")))?;

        let content = extract_content(&data)?;
        debug!(reply_len = content.len(), "generation complete");
        Ok(content)
    }
}

/// Text of the first choice.
fn extract_content(data: &Value) -> Result<String> {
    let choice = data["choices"]
        .as_array()
        .and_then(|choices| choices.first())
        .ok_or_else(|| PostcraftError::Upstream("generation returned no choices".into()))?;

    choice["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| PostcraftError::Upstream("generation returned no message content".into()))
}

/// Readable message for a failed generation request.
fn map_api_error(status: StatusCode, body: &str) -> String {
    match status.as_u16() {
        401 => "Invalid API key. Check your key at openrouter.ai/keys".to_string(),
        402 => "Insufficient credits. Visit openrouter.ai to add funds.".to_string(),
        429 => "Rate limited. Please wait a moment and try again.".to_string(),
        400 if body.contains("model_not_found") || body.contains("not found") => {
            "Model not found. Check the model ID at openrouter.ai/models".to_string()
        }
        500 | 502 | 503 => {
            "OpenRouter is temporarily unavailable. Try again in a moment.".to_string()
        }
        _ => format!("API error ({status}): {body}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenRouterClient {
        let config = OpenRouterConfig {
            base_url: format!("{}/api/v1", server.uri()),
            ..OpenRouterConfig::default()
        };
        OpenRouterClient::new(&config, "test-key", "test/model").unwrap()
    }

    #[tokio::test]
    async fn generate_returns_first_choice() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "test/model",
                "stream": false,
                "messages": [
                    {"role": "system", "content": "Be terse.\nUse markdown."},
                    {"role": "user", "content": "Outline Rust async"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "# Outline"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .generate("Outline Rust async", &["Be terse.", "Use markdown."])
            .await
            .unwrap();
        assert_eq!(reply, "# Outline");
    }

    #[tokio::test]
    async fn empty_choices_is_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("x", &[]).await.unwrap_err();
        assert!(matches!(err, PostcraftError::Upstream(ref msg) if msg.contains("no choices")));
    }

    #[tokio::test]
    async fn http_errors_are_mapped() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("x", &[]).await.unwrap_err();
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[test]
    fn map_api_error_covers_known_statuses() {
        assert!(map_api_error(StatusCode::PAYMENT_REQUIRED, "").contains("credits"));
        assert!(map_api_error(StatusCode::TOO_MANY_REQUESTS, "").contains("Rate limited"));
        assert!(map_api_error(StatusCode::BAD_GATEWAY, "").contains("unavailable"));
        assert!(
            map_api_error(StatusCode::BAD_REQUEST, "model_not_found").contains("Model not found")
        );
        assert_eq!(
            map_api_error(StatusCode::IM_A_TEAPOT, "short and stout"),
            "API error (418 I'm a teapot): short and stout"
        );
    }
}
