//! `/ws/progress` route (spec §6): fans out [`StatusEvent`]s for one job, or
//! every job, over a WebSocket connection backed by the Progress Broadcaster.

use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use loraflow_broadcaster::{CloseReason, Filter, SubscriptionEvent};
use loraflow_core::JobId;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    #[serde(default)]
    pub job_id: Option<String>,
}

pub async fn ws_progress(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let filter = match query.job_id {
        Some(id) => Filter::Job(JobId::from_string(id)),
        None => Filter::All,
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, filter))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, filter: Filter) {
    let subscribed_to = match &filter {
        Filter::All => "all".to_string(),
        Filter::Job(job_id) => job_id.to_string(),
    };
    let mut subscription = state.broadcaster.subscribe(filter);

    let hello = json!({ "type": "hello", "subscribed_to": subscribed_to });
    if socket.send(Message::Text(hello.to_string())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = subscription.recv() => {
                match event {
                    Some(SubscriptionEvent::Status(status_event)) => {
                        let payload = json!({
                            "type": "status",
                            "job_id": status_event.job_id,
                            "sequence": status_event.sequence,
                            "status": status_event.status,
                            "progress": status_event.progress,
                            "message": status_event.message,
                            "result": status_event.result,
                            "timestamp": status_event.timestamp,
                        });
                        if socket.send(Message::Text(payload.to_string())).await.is_err() {
                            break;
                        }
                    }
                    Some(SubscriptionEvent::Closed(reason)) => {
                        let reason = close_reason_str(reason);
                        let payload = json!({ "type": "close", "reason": reason });
                        let _ = socket.send(Message::Text(payload.to_string())).await;
                        break;
                    }
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    None | Some(Ok(Message::Close(_))) => break,
                    Some(Err(err)) => {
                        debug!(%err, "websocket recv error, closing");
                        break;
                    }
                    // This is a read-only feed; any other client frame is ignored.
                    Some(Ok(_)) => continue,
                }
            }
        }
    }

    subscription.close();
}

fn close_reason_str(reason: CloseReason) -> &'static str {
    match reason {
        CloseReason::SlowConsumer => "slow_consumer",
        CloseReason::ServerShutdown => "server_shutdown",
        CloseReason::Normal => "normal",
    }
}
