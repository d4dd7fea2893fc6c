//! Demonstration routes: `GET` and `POST {root}/ping`.

use axum::{
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Body of `GET {root}/ping`.
pub const PONG: &str = "pong!";

/// Caller name used when the request does not carry one.
pub const DEFAULT_CALLER: &str = "John Doe";

/// JSON envelope returned by both routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
struct PingRequest {
    name: Option<String>,
}

pub async fn get_ping() -> Json<Message> {
    Json(Message {
        message: PONG.to_string(),
    })
}

/// Greets the caller named in the JSON body. An empty body counts as an
/// anonymous caller; malformed JSON is a client error.
pub async fn post_ping(body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        PingRequest::default()
    } else {
        match serde_json::from_slice::<PingRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "Rejecting malformed ping body");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": format!("invalid JSON body: {}", e) })),
                )
                    .into_response();
            }
        }
    };

    let name = request.name.unwrap_or_else(|| DEFAULT_CALLER.to_string());
    tracing::info!(caller = %name, "Ping called");

    Json(Message {
        message: format!("hey {}", name),
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn message_of(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_get_ping() {
        let Json(body) = get_ping().await;
        assert_eq!(body.message, "pong!");
    }

    #[tokio::test]
    async fn test_post_ping_greets_caller() {
        let (status, body) = message_of(post_ping(Bytes::from(r#"{"name":"Ada"}"#)).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "hey Ada");
    }

    #[tokio::test]
    async fn test_post_ping_defaults_caller() {
        let (_, body) = message_of(post_ping(Bytes::new()).await).await;
        assert_eq!(body["message"], "hey John Doe");

        let (_, body) = message_of(post_ping(Bytes::from("{}")).await).await;
        assert_eq!(body["message"], "hey John Doe");

        let (_, body) = message_of(post_ping(Bytes::from(r#"{"name":null}"#)).await).await;
        assert_eq!(body["message"], "hey John Doe");
    }

    #[tokio::test]
    async fn test_post_ping_rejects_malformed_json() {
        let (status, body) = message_of(post_ping(Bytes::from("{name")).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("invalid JSON"));
    }
}
