//! Loopback endpoints. Every query gets exactly one JSON answer; failures
//! are answered with `{"error": ...}`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tether_bridge::Host;
use tether_common::{ApiMethod, ApiRequest};

use super::EngineState;

const MAX_DELAY_MS: u64 = 10_000;

pub(crate) async fn handle(state: &Arc<EngineState>, payload: &str) -> String {
    let request = match ApiRequest::from_json(payload) {
        Ok(request) => request,
        Err(e) => return error(&e),
    };
    tracing::debug!(method = ?request.method, endpoint = %request.path(), "engine handling query");
    match route(state, &request).await {
        Ok(value) => value.to_string(),
        Err(e) => error(&e),
    }
}

async fn route(state: &Arc<EngineState>, request: &ApiRequest) -> Result<Value, String> {
    match (request.method, request.path()) {
        (ApiMethod::Get, "version") => Ok(json!({ "version": env!("CARGO_PKG_VERSION") })),
        (ApiMethod::Get, "online") => Ok(json!({ "online": state.is_online() })),
        (ApiMethod::Get, "testing") => Ok(json!({ "testnet": state.testnet() })),
        (ApiMethod::Get, "locale") => {
            let locale = state
                .with_host(|host| host.preferred_locale())
                .unwrap_or_default();
            Ok(json!({ "locale": locale }))
        }
        (ApiMethod::Get, "theme") => {
            let dark = on_host(state, |host| host.detect_dark_theme()).await?;
            Ok(json!({ "dark": dark }))
        }
        (ApiMethod::Post, "theme") => {
            let dark = match request.body.trim() {
                "dark" => true,
                "light" => false,
                other => return Err(format!("unknown theme: {other}")),
            };
            state.with_host(|host| host.set_dark_theme(dark));
            Ok(json!({ "dark": dark }))
        }
        (ApiMethod::Post, "echo") => Ok(json!({ "echo": request.body })),
        (ApiMethod::Post, "delay") => {
            let ms: u64 = request
                .body
                .trim()
                .parse()
                .map_err(|_| format!("invalid delay: {}", request.body))?;
            let ms = ms.min(MAX_DELAY_MS);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(json!({ "delayed_ms": ms }))
        }
        (ApiMethod::Post, "export") => {
            let suggested = if request.body.is_empty() {
                "export.json".to_string()
            } else {
                request.body.clone()
            };
            let path = on_host(state, move |host| host.get_save_filename(&suggested)).await?;
            if path.is_empty() {
                Ok(json!({ "cancelled": true }))
            } else {
                Ok(json!({ "path": path }))
            }
        }
        (ApiMethod::Post, "open") => {
            let url = request.body.clone();
            on_host(state, move |host| host.system_open(&url))
                .await?
                .map_err(|e| e.to_string())?;
            Ok(json!({ "opened": true }))
        }
        (ApiMethod::Post, "notify") => {
            state.with_host(|host| host.notify_user(&request.body));
            Ok(json!({ "notified": true }))
        }
        (_, path) => Err(format!("unknown endpoint: {path}")),
    }
}

/// Run a host callback that may block on the UI thread off the async
/// workers.
async fn on_host<R, F>(state: &Arc<EngineState>, f: F) -> Result<R, String>
where
    R: Send + 'static,
    F: FnOnce(&dyn Host) -> R + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || state.with_host(f))
        .await
        .map_err(|e| format!("engine task failed: {e}"))?
        .ok_or_else(|| "engine is stopping".to_string())
}

fn error(message: &str) -> String {
    json!({ "error": message }).to_string()
}
