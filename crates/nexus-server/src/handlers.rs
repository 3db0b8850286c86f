use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use nexus_core::AgentConfig;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::ApiError;
use crate::server::AppState;

/// Parse a JSON object body. Empty, malformed or non-object bodies read as `{}`.
fn read_body(body: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => Map::new(),
    }
}

/// String value of `key`, ignoring anything that is not a string.
fn str_field<'a>(body: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str)
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
        "runtime_available": state.invoker.capabilities().runtime,
        "agents": state.registry.len(),
    }))
}

pub async fn list_agents(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "agents": state.registry.list() }))
}

pub async fn register_agent(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let slot = state
        .registry
        .register(AgentConfig::from_fields(read_body(&body)))?;
    Ok(Json(json!({ "ok": true, "id": slot.id() })))
}

pub async fn remove_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.registry.remove(&id)?;
    Ok(Json(json!({ "ok": true, "id": id })))
}

/// `history` in the body is accepted and ignored; conversation state comes
/// from the session.
pub async fn run_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let slot = state.registry.get(&id)?;
    let body = read_body(&body);
    let session_id = str_field(&body, "session_id")
        .unwrap_or(state.invoker.default_session_id())
        .to_string();
    let message = str_field(&body, "message").unwrap_or_default().to_string();
    debug!("Run agent={id} session={session_id}");

    // Each invocation gets its own task; a panic inside it becomes a 500.
    let invoker = state.invoker.clone();
    let content =
        tokio::spawn(async move { invoker.invoke(&slot, &session_id, &message).await }).await?;

    Ok(Json(json!({ "ok": true, "content": content })))
}

/// Unknown paths and unsupported methods on known paths.
pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_body_is_lenient() {
        assert!(read_body(b"").is_empty());
        assert!(read_body(b"not json").is_empty());
        assert!(read_body(b"[1, 2]").is_empty());
        assert_eq!(read_body(br#"{"id":"a1"}"#)["id"], json!("a1"));
    }

    #[test]
    fn fields_are_read_independently() {
        let body = read_body(br#"{"session_id":"s1","message":["hi"],"history":[]}"#);
        assert_eq!(str_field(&body, "session_id"), Some("s1"));
        assert_eq!(str_field(&body, "message"), None);
        assert_eq!(str_field(&body, "missing"), None);
    }
}
