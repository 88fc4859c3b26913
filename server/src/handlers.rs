use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use blueprint_shared::chat::{ChatErrorBody, ChatReply, ChatRequest};
use tracing::{info, warn};
use uuid::Uuid;

use crate::prompt::build_messages;
use crate::state::AppState;
use crate::upstream::UpstreamError;

pub async fn ping_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

fn error_response(status: StatusCode, error: &str, details: Option<String>) -> Response {
    (
        status,
        Json(ChatErrorBody {
            error: error.to_string(),
            details,
        }),
    )
        .into_response()
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        match self {
            UpstreamError::NotConfigured => error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "chat is not configured on this server",
                None,
            ),
            other => error_response(
                StatusCode::BAD_GATEWAY,
                "the assistant could not answer",
                Some(other.to_string()),
            ),
        }
    }
}

pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "request body must be JSON with a message",
                Some(rejection.body_text()),
            )
        }
    };
    let question = match request.validate() {
        Ok(question) => question,
        Err(error) => return error_response(StatusCode::BAD_REQUEST, &error.to_string(), None),
    };

    let request_id = Uuid::new_v4();
    info!(%request_id, chars = question.chars().count(), "chat request");
    match state.upstream.complete(build_messages(&request, question)).await {
        Ok(reply) => Json(ChatReply { reply }).into_response(),
        Err(error) => {
            warn!(%request_id, %error, "chat relay failed");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use blueprint_shared::Snapshot;

    use super::*;
    use crate::prompt::ChatMessage;
    use crate::upstream::{UnconfiguredUpstream, Upstream};

    #[derive(Default)]
    struct FakeUpstream {
        reply: Option<String>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl Upstream for FakeUpstream {
        async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, UpstreamError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(messages);
            }
            self.reply.clone().ok_or(UpstreamError::Status {
                status: 500,
                body: "boom".into(),
            })
        }
    }

    async fn call(upstream: Arc<dyn Upstream>, request: ChatRequest) -> (StatusCode, serde_json::Value) {
        let response = chat_handler(State(AppState::new(upstream)), Ok(Json(request))).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn relays_reply_with_snapshot_context() {
        let upstream = Arc::new(FakeUpstream {
            reply: Some("Roughly 8 boxes.".into()),
            ..FakeUpstream::default()
        });
        let (status, body) = call(
            upstream.clone(),
            ChatRequest::new("How many boxes?", Snapshot::default()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], "Roughly 8 boxes.");
        let seen = upstream.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][2].content, "How many boxes?");
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        let upstream = Arc::new(FakeUpstream::default());
        let (status, body) = call(upstream.clone(), ChatRequest::new("  ", Snapshot::default())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(upstream.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_message_is_bad_request() {
        let request = ChatRequest::new("x".repeat(2001), Snapshot::default());
        let (status, _) = call(Arc::new(FakeUpstream::default()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unconfigured_relay_is_unavailable() {
        let (status, body) = call(
            Arc::new(UnconfiguredUpstream),
            ChatRequest::new("hi", Snapshot::default()),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn upstream_failure_is_bad_gateway() {
        let (status, body) = call(
            Arc::new(FakeUpstream::default()),
            ChatRequest::new("hi", Snapshot::default()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["details"].as_str().unwrap().contains("500"));
    }
}
