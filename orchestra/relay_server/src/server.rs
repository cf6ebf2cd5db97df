use crate::session::{SessionHandle, SessionRegistry};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{HeaderValue, Method};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use hand_robot_lib::{
    map_hand_report, now_millis, ClientMessage, CommandOutput, ServerMessage, StatusReport, WireEncoding,
    RELAY_WS_PATH,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Mutex<SessionRegistry>>,
    pub started: Instant,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(SessionRegistry::new())),
            started: Instant::now(),
        }
    }

    pub fn registry(&self) -> MutexGuard<'_, SessionRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route(RELAY_WS_PATH, get(ws_handler))
        .route("/api/status", get(status))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    info!("CORS allowed origins: {:?}", allowed_origins);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let origins = if origins.is_empty() {
        warn!("No valid CORS origins configured, defaulting to localhost");
        vec![
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:5173"),
        ]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::ACCEPT])
}

pub async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(StatusReport {
        status: "ok".to_string(),
        clients: state.registry().count(),
        uptime: state.started.elapsed().as_secs_f64(),
    })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let SessionHandle {
        id,
        mut outbound,
        mut close,
    } = state.registry().register(Instant::now());
    let (mut sender, mut receiver) = socket.split();

    info!(client_id = %id, "Client connected");

    let greeting = ServerMessage::connected(id.as_str()).to_text();
    if sender.send(Message::Text(greeting)).await.is_err() {
        state.registry().remove(&id);
        return;
    }

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let reply = match incoming {
                    Some(Ok(Message::Text(text))) => handle_text(&state, &id, &text),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => handle_text(&state, &id, &text),
                        Err(_) => {
                            state.registry().touch(&id, Instant::now());
                            Some(ServerMessage::invalid_format())
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        state.registry().touch(&id, Instant::now());
                        None
                    }
                    Some(Err(e)) => {
                        warn!(client_id = %id, "Socket error: {}", e);
                        break;
                    }
                };

                if let Some(reply) = reply {
                    if sender.send(Message::Text(reply.to_text())).await.is_err() {
                        break;
                    }
                }
            }
            relayed = outbound.recv() => match relayed {
                Some(message) => {
                    if sender.send(message).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = &mut close => {
                info!(client_id = %id, "Closing stale session");
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state.registry().remove(&id);
    info!(client_id = %id, "Client disconnected");
}

/// Apply one inbound text frame to the registry and build the reply, if any.
///
/// The registry lock is held only for this synchronous step.
pub fn handle_text(state: &AppState, id: &str, text: &str) -> Option<ServerMessage> {
    let mut registry = state.registry();
    registry.touch(id, Instant::now());

    let message = match ClientMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            debug!(client_id = %id, "Rejected message: {}", e);
            return Some(ServerMessage::invalid_format());
        }
    };

    match message {
        ClientMessage::Heartbeat => Some(ServerMessage::heartbeat(now_millis())),
        ClientMessage::Subscribe => {
            if !registry.is_subscribed(id) {
                registry.subscribe(id);
                info!(client_id = %id, "Client subscribed to commands");
            }
            Some(ServerMessage::subscribed(id))
        }
        ClientMessage::Unrecognized => None,
        payload => {
            match relay_output(&payload) {
                Some(output) => {
                    let text = output.encode(WireEncoding::Json);
                    let delivered = registry.broadcast_to_subscribers(id, &text);
                    debug!(client_id = %id, delivered, "Relayed {}", text);
                }
                None => debug!(client_id = %id, "Hand payload not mappable, not relayed"),
            }
            Some(ServerMessage::received(now_millis()))
        }
    }
}

/// The command a payload-bearing message turns into
fn relay_output(message: &ClientMessage) -> Option<CommandOutput> {
    match message {
        ClientMessage::HandData(report) => Some(CommandOutput::Command(map_hand_report(report))),
        ClientMessage::Command(command) => Some(CommandOutput::Command(*command)),
        ClientMessage::HandNotDetected => Some(CommandOutput::HandNotDetected),
        ClientMessage::UnmappedHand
        | ClientMessage::Heartbeat
        | ClientMessage::Subscribe
        | ClientMessage::Unrecognized => None,
    }
}

/// Periodically evict sessions that stopped talking
pub fn spawn_sweeper(state: AppState, every: Duration, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;

        loop {
            interval.tick().await;
            let evicted = state.registry().evict_stale(Instant::now(), timeout);
            for id in &evicted {
                info!(client_id = %id, "Session timed out");
            }
        }
    })
}
