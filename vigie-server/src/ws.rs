/**
 * PUSH WEBSOCKET - Mise à jour temps réel du dashboard
 *
 * RÔLE : Push périodique des stats agrégées vers les clients connectés
 * sur /ws, sans que le frontend ait à poller l'API REST.
 *
 * FONCTIONNEMENT :
 * - À la connexion : frame de bienvenue {"type":"connection",...}
 * - Ensuite toutes les 30s : re-lecture du store et frame
 *   {"type":"stats_update","data":{...}}
 * - Un timer par connexion ; la déconnexion du client arrête la boucle
 */

use crate::http::AppState;
use crate::models::DashboardStats;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::time::Duration;
use tokio::time::{interval_at, Instant};

const PUSH_INTERVAL: Duration = Duration::from_secs(30);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

async fn handle_socket(socket: WebSocket, app: AppState) {
    println!("[ws] client connected");
    app.health.ws_client_connected();

    let (mut sender, mut receiver) = socket.split();

    if sender
        .send(Message::Text(greeting_message().into()))
        .await
        .is_err()
    {
        app.health.ws_client_disconnected();
        return;
    }

    // premier tick à +30s, la frame de bienvenue vient de partir
    let mut interval = interval_at(Instant::now() + PUSH_INTERVAL, PUSH_INTERVAL);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let frame = match app.store.dashboard_stats() {
                    Ok(stats) => stats_message(&stats),
                    Err(e) => {
                        eprintln!("[ws] failed to read stats: {e}");
                        continue;
                    }
                };
                if sender.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    // frames entrantes ignorées, seul le close nous intéresse
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    app.health.ws_client_disconnected();
    println!("[ws] client disconnected");
}

fn greeting_message() -> String {
    json!({
        "type": "connection",
        "message": "Connected to network monitoring system"
    })
    .to_string()
}

fn stats_message(stats: &DashboardStats) -> String {
    json!({
        "type": "stats_update",
        "data": stats
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_shapes() {
        let greeting: serde_json::Value = serde_json::from_str(&greeting_message()).unwrap();
        assert_eq!(greeting["type"], "connection");

        let stats = DashboardStats {
            total_nodes: 8,
            online_nodes: 6,
            active_connections: 3,
            active_alerts: 2,
            critical_alerts: 1,
            avg_latency_ms: Some(24.0),
        };
        let frame: serde_json::Value = serde_json::from_str(&stats_message(&stats)).unwrap();
        assert_eq!(frame["type"], "stats_update");
        assert_eq!(frame["data"]["total_nodes"], 8);
        assert_eq!(frame["data"]["avg_latency_ms"], 24.0);
    }
}
