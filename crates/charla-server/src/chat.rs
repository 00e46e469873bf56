//! `POST /api/chat`: the fallback request/response endpoint.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use charla_core::apology;
use charla_core::wire::{ChatResponse, ErrorBody};
use charla_responder::ResponderError;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::server::AppState;

/// Pull a usable message out of a request body.
///
/// Returns `None` for invalid JSON, a missing or non-string `message`, or one
/// that is empty after trimming.
pub fn extract_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let text = value.get("message")?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

fn error_response(status: StatusCode, error: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: error.to_owned(),
        }),
    )
        .into_response()
}

/// POST handler.
pub async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let Some(message) = extract_message(&body) else {
        debug!("chat request without a usable message");
        return error_response(StatusCode::BAD_REQUEST, apology::MESSAGE_REQUIRED);
    };

    match state.responder.respond(&message).await {
        Ok(reply) => Json(ChatResponse {
            message: reply,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })
        .into_response(),
        Err(ResponderError::EmptyMessage) => {
            error_response(StatusCode::BAD_REQUEST, apology::MESSAGE_REQUIRED)
        }
        Err(e) => {
            warn!(error = %e, "responder failed on fallback request");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, apology::PROCESSING_FAILED)
        }
    }
}

/// Any method other than POST.
pub async fn method_not_allowed(method: Method) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        format!("Method {method} Not Allowed"),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_trimmed_message() {
        assert_eq!(
            extract_message(br#"{"message":"  hola  "}"#).as_deref(),
            Some("hola")
        );
    }

    #[test]
    fn rejects_unusable_bodies() {
        for body in [
            &b""[..],
            b"{not json",
            b"{}",
            br#"{"message":""}"#,
            br#"{"message":"   "}"#,
            br#"{"message":42}"#,
            br#"{"message":null}"#,
            br#"["hola"]"#,
        ] {
            assert!(extract_message(body).is_none(), "{}", String::from_utf8_lossy(body));
        }
    }
}
