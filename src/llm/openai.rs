use std::fmt;
use std::time::Duration;

use anyhow::Context;
use axum::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::{TextGenerator, TransportError};
use crate::config::LlmConfig;
use crate::meals::prompt::GenerationRequest;

/// Chat-completions client for OpenAI-compatible APIs.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    json_mode: bool,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("json_mode", &self.json_mode)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl OpenAiClient {
    pub fn new(cfg: &LlmConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build llm http client")?;
        Ok(Self {
            client,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            endpoint: format!("{}/chat/completions", cfg.api_base.trim_end_matches('/')),
            json_mode: cfg.json_mode,
        })
    }
}

/// Pulls `error.message` out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: &GenerationRequest) -> Result<String, TransportError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_instruction,
                },
            ],
            response_format: self
                .json_mode
                .then_some(ResponseFormat { r#type: "json_object" }),
        };

        debug!(endpoint = %self.endpoint, "sending chat completion");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let message = error_message(&text);
            error!(%status, %message, "chat completion failed");
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(TransportError::MissingContent)
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Clone)]
    struct Backend {
        status: StatusCode,
        reply: Value,
        seen: Arc<Mutex<Option<(Option<String>, Value)>>>,
    }

    async fn chat(
        State(backend): State<Backend>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let auth = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        *backend.seen.lock().await = Some((auth, body));
        (backend.status, Json(backend.reply.clone()))
    }

    async fn spawn_backend(backend: Backend) -> SocketAddr {
        let app = Router::new()
            .route("/v1/chat/completions", post(chat))
            .with_state(backend);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn client_for(addr: SocketAddr, json_mode: bool) -> OpenAiClient {
        OpenAiClient::new(&LlmConfig {
            api_key: "sk-test".into(),
            model: "gpt-test".into(),
            api_base: format!("http://{addr}/v1/"),
            timeout_secs: 5,
            json_mode,
        })
        .unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            system_instruction: "contract".into(),
            user_instruction: "chicken please".into(),
        }
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let seen = Arc::new(Mutex::new(None));
        let addr = spawn_backend(Backend {
            status: StatusCode::OK,
            reply: json!({ "choices": [
                { "message": { "role": "assistant", "content": "{\"lunch\":{}}" } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]}),
            seen: seen.clone(),
        })
        .await;

        let content = client_for(addr, true).complete(&request()).await.unwrap();
        assert_eq!(content, "{\"lunch\":{}}");

        let (auth, body) = seen.lock().await.clone().expect("backend was called");
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "contract");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "chicken please");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn json_mode_can_be_disabled() {
        let seen = Arc::new(Mutex::new(None));
        let addr = spawn_backend(Backend {
            status: StatusCode::OK,
            reply: json!({ "choices": [{ "message": { "content": "{}" } }] }),
            seen: seen.clone(),
        })
        .await;

        client_for(addr, false).complete(&request()).await.unwrap();
        let (_, body) = seen.lock().await.clone().unwrap();
        assert!(body.get("response_format").is_none());
    }

    #[tokio::test]
    async fn non_success_status_carries_backend_message() {
        let addr = spawn_backend(Backend {
            status: StatusCode::UNAUTHORIZED,
            reply: json!({ "error": { "message": "Incorrect API key provided" } }),
            seen: Arc::new(Mutex::new(None)),
        })
        .await;

        let err = client_for(addr, true).complete(&request()).await.unwrap_err();
        match err {
            TransportError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_missing_content() {
        let addr = spawn_backend(Backend {
            status: StatusCode::OK,
            reply: json!({ "choices": [] }),
            seen: Arc::new(Mutex::new(None)),
        })
        .await;

        let err = client_for(addr, true).complete(&request()).await.unwrap_err();
        assert!(matches!(err, TransportError::MissingContent));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_request_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(addr, true).complete(&request()).await.unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message("upstream exploded"), "upstream exploded");
        assert_eq!(
            error_message(r#"{"error":{"message":"rate limited"}}"#),
            "rate limited"
        );
        assert_eq!(error_message(r#"{"error":{}}"#), r#"{"error":{}}"#);
    }

    #[test]
    fn debug_output_hides_the_api_key() {
        let client = OpenAiClient::new(&LlmConfig {
            api_key: "sk-secret-value".into(),
            model: "gpt-test".into(),
            api_base: "http://127.0.0.1:1/v1".into(),
            timeout_secs: 5,
            json_mode: true,
        })
        .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-secret-value"), "{debug}");
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("gpt-test"));
    }
}
