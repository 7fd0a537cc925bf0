//! HTTP and WebSocket surface for the web console
//!
//! `/ws` carries the real-time event envelope; the `/api/*` routes are
//! read-only views for tooling. Default port: 5050

use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::sync::{ClientEvent, SyncHandle};
use crate::topology::AddressedChannel;

/// Shared state for API handlers
pub struct ApiState {
    pub sync: SyncHandle,
    /// Built web console served at `/`, if any
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    clients: usize,
}

/// API error response
#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::SERVICE_UNAVAILABLE, Json(self)).into_response()
    }
}

/// Build the API router
pub fn build_router(state: Arc<ApiState>) -> Router {
    let static_dir = state.static_dir.clone();

    let router = Router::new()
        .route("/ws", get(mixer_ws))
        .route("/api/health", get(health_check))
        .route("/api/state", get(get_state))
        .route("/api/presets", get(list_presets))
        .route("/api/layout", get(get_layout))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => {
            info!("Serving web console from {}", dir.display());
            router.fallback_service(ServeDir::new(dir))
        }
        None => router,
    };

    router.layer(CorsLayer::permissive())
}

/// GET /api/health
async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let status = if state.sync.is_alive() { "ok" } else { "stopped" };
    Json(HealthResponse {
        status,
        clients: state.sync.client_count().await,
    })
}

/// GET /api/state - Current canonical mixer state
async fn get_state(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.sync.snapshot().await {
        Some(snapshot) => Ok(Json(snapshot).into_response()),
        None => Err(ApiError {
            error: "mixer is not running".to_string(),
        }),
    }
}

/// GET /api/presets - Stored preset names
async fn list_presets(State(state): State<Arc<ApiState>>) -> Json<Vec<String>> {
    Json(state.sync.preset_names().await)
}

/// GET /api/layout - Channel layout with control addresses
async fn get_layout(State(state): State<Arc<ApiState>>) -> Json<Vec<AddressedChannel>> {
    Json(state.sync.layout().await)
}

/// GET /ws - Real-time mixer session
async fn mixer_ws(ws: WebSocketUpgrade, State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let sync = state.sync.clone();
    ws.on_upgrade(move |socket| handle_websocket(socket, sync))
}

/// Pump one client: outbound events from the actor, inbound frames to it
async fn handle_websocket(mut socket: WebSocket, sync: SyncHandle) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = sync.connect(tx);
    debug!("WebSocket client {} attached", client);

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                let Some(event) = outbound else {
                    debug!("Sync actor dropped client {}", client);
                    break;
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode event for client {}: {}", client, e);
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    debug!("WebSocket client {} disconnected", client);
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(text.as_str()) {
                            Ok(event) => sync.dispatch(client, event),
                            Err(e) => warn!("Ignoring malformed frame from client {}: {}", client, e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client {} closed connection", client);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {
                        // Binary and pong frames carry nothing for us
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error on client {}: {}", client, e);
                        break;
                    }
                }
            }
        }
    }

    sync.disconnect(client);
}

/// Start the API server and run until `shutdown` resolves
pub async fn start_server(
    state: Arc<ApiState>,
    addr: &str,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind server on {}", addr))?;
    info!("Web console listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::MixerStore;
    use crate::output::ControlTranslator;
    use crate::presets::PresetStore;
    use crate::sync::SyncActor;
    use crate::topology::generic_layout;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn spawn_sync() -> SyncHandle {
        let layout = generic_layout(2);
        SyncActor::new(
            MixerStore::new(&["CH 1", "CH 2"], 70),
            layout,
            PresetStore::temporary().unwrap(),
            ControlTranslator::inert(),
        )
        .spawn()
    }

    async fn http_get(router: Router, path: &str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_state_endpoint_returns_four_buses() {
        let state = Arc::new(ApiState {
            sync: spawn_sync(),
            static_dir: None,
        });
        let response = http_get(build_router(state), "/api/state").await;

        assert!(response.starts_with("HTTP/1.1 200"));
        let body = &response[response.find("\r\n\r\n").unwrap() + 4..];
        let value: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 4);
        assert_eq!(value[0][1]["name"], "CH 2");
        assert_eq!(value[0][1]["faderValue"], 70);
    }

    #[tokio::test]
    async fn test_state_endpoint_when_actor_stopped() {
        let sync = spawn_sync();
        sync.shutdown();
        while sync.is_alive() {
            tokio::task::yield_now().await;
        }

        let state = Arc::new(ApiState {
            sync,
            static_dir: None,
        });
        let response = http_get(build_router(state), "/api/state").await;
        assert!(response.starts_with("HTTP/1.1 503"));
    }

    #[tokio::test]
    async fn test_layout_and_presets_endpoints() {
        let state = Arc::new(ApiState {
            sync: spawn_sync(),
            static_dir: None,
        });

        let layout = http_get(build_router(state.clone()), "/api/layout").await;
        assert!(layout.contains(r#"{"chid":1,"name":"CH 2","stereo":false}"#));

        let presets = http_get(build_router(state), "/api/presets").await;
        assert!(presets.ends_with("[]"));
    }

    #[tokio::test]
    async fn test_static_dir_is_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>console</h1>").unwrap();

        let state = Arc::new(ApiState {
            sync: spawn_sync(),
            static_dir: Some(dir.path().to_path_buf()),
        });
        let response = http_get(build_router(state), "/index.html").await;
        assert!(response.contains("<h1>console</h1>"));
    }
}
