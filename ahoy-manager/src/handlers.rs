use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ahoy_providers::RelayReply;
use serde_json::Value;
use tracing::{debug, error};

use crate::state::{AppState, ErrorResponse};

pub const INVALID_MESSAGES_ERROR: &str = "Invalid or missing messages array.";
pub const MISSING_KEY_ERROR: &str = "Gemini API key is missing";
pub const UPSTREAM_ERROR: &str = "Failed to call Gemini API";

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let messages = match payload {
        Ok(Json(body)) => body.get("messages").and_then(Value::as_array).cloned(),
        Err(e) => {
            debug!("Rejected chat body: {}", e);
            None
        }
    };
    let Some(messages) = messages else {
        return error_response(StatusCode::BAD_REQUEST, INVALID_MESSAGES_ERROR);
    };

    let Some(provider) = state.provider.as_ref() else {
        error!("Chat request received but no Gemini API key is configured");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, MISSING_KEY_ERROR);
    };

    let turns = state.build_turns(&messages);
    debug!("Relaying {} messages to {}", messages.len(), provider.model());

    match provider.generate(turns).await {
        Ok(reply) => {
            let text = reply
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| state.fallback_text.clone());
            Json(RelayReply { text: Some(text) }).into_response()
        }
        Err(e) => {
            error!("Error calling Gemini API: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::router;
    use ahoy_core::config::ProviderConfig;
    use ahoy_providers::{ChatProvider, ProviderError, ProviderResult, Role, Turn};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    struct FakeProvider {
        reply: Mutex<Option<ProviderResult<Option<String>>>>,
        seen: Mutex<Vec<Turn>>,
    }

    impl FakeProvider {
        fn new(reply: ProviderResult<Option<String>>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatProvider for FakeProvider {
        async fn generate(&self, turns: Vec<Turn>) -> ProviderResult<Option<String>> {
            *self.seen.lock().unwrap() = turns;
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Ok(None))
        }

        fn model(&self) -> &str {
            "fake"
        }
    }

    fn state_with(provider: Option<Arc<dyn ChatProvider>>) -> AppState {
        AppState::new(provider, &ProviderConfig::default())
    }

    fn state_for(provider: &Arc<FakeProvider>) -> AppState {
        let provider: Arc<dyn ChatProvider> = provider.clone();
        state_with(Some(provider))
    }

    async fn post_chat(state: AppState, body: &str) -> (StatusCode, Value) {
        let app = router(state, "http://localhost:5173");
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_chat_relays_history_with_pirate_instruction() {
        let provider = FakeProvider::new(Ok(Some("Ahoy, matey!".to_string())));
        let state = state_for(&provider);

        let (status, body) = post_chat(
            state,
            r#"{"messages":[
                {"text":"Hello","sender":"user","timestamp":1},
                {"text":"Ahoy!","sender":"ai","timestamp":2},
                {"text":"Where be the treasure?","sender":"user","timestamp":3}
            ]}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"text": "Ahoy, matey!"}));

        let seen = provider.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                Turn::user("You are a helpful assistant who talks like a pirate."),
                Turn::user("Hello"),
                Turn::model("Ahoy!"),
                Turn::user("Where be the treasure?"),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_sender_maps_to_user() {
        let provider = FakeProvider::new(Ok(Some("Arr".to_string())));
        let state = state_for(&provider);

        let (status, _) = post_chat(
            state,
            r#"{"messages":[{"text":"hi","sender":"assistant"},{"sender":"ai"}]}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let seen = provider.seen.lock().unwrap().clone();
        assert_eq!(seen[1].role, Role::User);
        assert_eq!(seen[2], Turn::model(""));
    }

    #[tokio::test]
    async fn test_missing_messages_is_bad_request() {
        let provider = FakeProvider::new(Ok(Some("unused".to_string())));
        for body in [r#"{}"#, r#"{"messages":"hello"}"#, r#"[1,2]"#, "not json"] {
            let (status, value) = post_chat(state_for(&provider), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(value["error"], INVALID_MESSAGES_ERROR);
        }
    }

    #[tokio::test]
    async fn test_missing_key_is_server_error() {
        let (status, value) = post_chat(state_with(None), r#"{"messages":[]}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value["error"], MISSING_KEY_ERROR);
    }

    #[tokio::test]
    async fn test_empty_reply_uses_fallback() {
        for reply in [None, Some(String::new())] {
            let provider = FakeProvider::new(Ok(reply));
            let (status, value) =
                post_chat(state_for(&provider), r#"{"messages":[]}"#).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(value["text"], "Arr! No response.");
        }
    }

    #[tokio::test]
    async fn test_upstream_failure_is_server_error() {
        let provider = FakeProvider::new(Err(ProviderError::ApiError("429: quota".to_string())));
        let (status, value) = post_chat(
            state_for(&provider),
            r#"{"messages":[{"text":"Hello","sender":"user","timestamp":1}]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value["error"], UPSTREAM_ERROR);
    }
}
