//! Fallback Caller: one discrete request/response call per message.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use charla_core::wire::{ChatRequest, ChatResponse, ErrorBody};
use charla_core::{ChatError, Message, Mode, Reply};
use charla_settings::ClientSettings;
use tracing::{debug, warn};

/// A way to reach the responder without the realtime connection.
#[async_trait]
pub trait FallbackTransport: Send + Sync {
    /// Deliver `message` and return the reply text.
    async fn call(&self, message: &str) -> charla_core::Result<String>;
}

/// `POST {base}/api/chat` backed by `reqwest`.
pub struct HttpFallback {
    client: reqwest::Client,
    url: String,
}

impl HttpFallback {
    /// Client for `url` with a per-request `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("charla/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            url: url.into(),
        }
    }

    /// Client configured from settings.
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self::new(settings.chat_url(), settings.http_timeout())
    }
}

#[async_trait]
impl FallbackTransport for HttpFallback {
    async fn call(&self, message: &str) -> charla_core::Result<String> {
        let response = self
            .client
            .post(&self.url)
            .json(&ChatRequest {
                message: message.to_owned(),
            })
            .send()
            .await
            .map_err(|e| ChatError::transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(ChatError::Responder {
                status: Some(status.as_u16()),
                message: detail,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::responder(format!("malformed response: {e}")))?;
        if body.message.trim().is_empty() {
            return Err(ChatError::responder("empty reply"));
        }
        Ok(body.message)
    }
}

/// Wraps a [`FallbackTransport`], turning every failure into an apology.
#[derive(Clone)]
pub struct FallbackCaller {
    transport: Arc<dyn FallbackTransport>,
}

impl FallbackCaller {
    /// Caller over `transport`.
    pub fn new(transport: Arc<dyn FallbackTransport>) -> Self {
        Self { transport }
    }

    /// Send `message` once. No retries.
    pub async fn send(&self, message: &Message) -> Reply {
        match self.transport.call(message.text()).await {
            Ok(text) => {
                debug!(mode = %Mode::Fallback, "reply received");
                Reply::bot(text, Mode::Fallback)
            }
            Err(e) => {
                warn!(mode = %Mode::Fallback, error = %e, kind = %e.kind(), "fallback delivery failed");
                Reply::apology(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use charla_core::apology;
    use charla_core::logging::capture_logs;
    use charla_core::{ErrorKind, ReplySource};
    use tracing::Level;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_chat(template: ResponseTemplate) -> (MockServer, HttpFallback) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(template)
            .mount(&server)
            .await;
        let fallback = HttpFallback::new(format!("{}/api/chat", server.uri()), Duration::from_secs(5));
        (server, fallback)
    }

    #[tokio::test]
    async fn success_returns_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(serde_json::json!({"message": "ayuda"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Estoy aquí para ayudarte. ¿Qué necesitas?",
                "timestamp": "2026-01-01T00:00:00.000Z"
            })))
            .expect(1)
            .mount(&server)
            .await;
        let fallback = HttpFallback::new(format!("{}/api/chat", server.uri()), Duration::from_secs(5));

        let text = fallback.call("ayuda").await.unwrap();
        assert_eq!(text, "Estoy aquí para ayudarte. ¿Qué necesitas?");
    }

    #[tokio::test]
    async fn error_status_carries_status_and_body() {
        let (_server, fallback) = mock_chat(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "Mensaje requerido"})),
        )
        .await;
        let err = fallback.call("hola").await.unwrap_err();
        assert_matches!(err, ChatError::Responder { status: Some(400), ref message } if message == "Mensaje requerido");
    }

    #[tokio::test]
    async fn malformed_body_is_responder_error() {
        let (_server, fallback) =
            mock_chat(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;
        assert_matches!(
            fallback.call("hola").await,
            Err(ChatError::Responder { status: None, .. })
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let fallback = HttpFallback::new(format!("http://{addr}/api/chat"), Duration::from_secs(2));
        assert_matches!(fallback.call("hola").await, Err(ChatError::Transport { .. }));
    }

    #[tokio::test]
    async fn slow_server_hits_client_timeout() {
        let (_server, fallback) = mock_chat(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(serde_json::json!({"message": "tarde", "timestamp": "x"})),
        )
        .await;
        let fallback = HttpFallback {
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(100))
                .build()
                .unwrap(),
            ..fallback
        };
        assert_matches!(fallback.call("hola").await, Err(ChatError::Transport { .. }));
    }

    #[tokio::test]
    async fn caller_turns_failure_into_apology_and_warns() {
        let (_server, fallback) = mock_chat(ResponseTemplate::new(500)).await;
        let caller = FallbackCaller::new(Arc::new(fallback));
        let (logs, _guard) = capture_logs();

        let reply = caller.send(&Message::parse("hola").unwrap()).await;
        assert_eq!(reply.text(), apology::PROCESSING_FAILED);
        assert_eq!(reply.source(), ReplySource::Apology(ErrorKind::Responder));
        assert!(logs.has_event(Level::WARN, "fallback delivery failed"));
    }

    #[tokio::test]
    async fn caller_success_is_tagged_fallback() {
        let (_server, fallback) = mock_chat(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"message": "¡Hola!", "timestamp": "2026-01-01T00:00:00Z"}),
        ))
        .await;
        let reply = FallbackCaller::new(Arc::new(fallback))
            .send(&Message::parse(" hola ").unwrap())
            .await;
        assert_eq!(reply.text(), "¡Hola!");
        assert_eq!(reply.source(), ReplySource::Bot(Mode::Fallback));
    }
}
