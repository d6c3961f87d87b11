//! WebSocket channel for the crash game.
//!
//! Fan-out of round lifecycle and bank events to every connected observer,
//! plus inbound `placeBet`/`cashout` messages from players. Replies to a
//! player's own messages go back on their socket; lifecycle events reach
//! everyone through the engine's broadcast channel.

use super::handlers::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::crash::engine::CrashEvent;
use crate::multiplier::Multiplier;

/// Messages a client may send over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    #[serde(rename = "placeBet")]
    PlaceBet {
        #[serde(rename = "clientId")]
        client_id: String,
        amount: u64,
        #[serde(rename = "roundId")]
        round_id: String,
    },
    #[serde(rename = "cashout")]
    Cashout {
        #[serde(rename = "clientId")]
        client_id: String,
        #[serde(rename = "roundId")]
        round_id: String,
    },
}

/// Direct replies to a client's own messages.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum WsReply {
    #[serde(rename = "bet:accepted")]
    BetAccepted { round_id: String, amount: u64 },
    #[serde(rename = "cashout:ok")]
    CashoutOk { payout: u64, multiplier: Multiplier },
    #[serde(rename = "error")]
    Error {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// WebSocket endpoint handler.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.crash.subscribe();

    // Welcome snapshot: bank and recent rounds, like any late joiner needs.
    if let Ok(snapshot) = state.crash.snapshot().await {
        let info = CrashEvent::Info {
            bank: snapshot.bank,
            history: state.crash.history().recent(10),
        };
        if send_json(&mut sender, &info).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if send_json(&mut sender, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("websocket client lagged; skipped {} events", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            message = receiver.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_client_message(&state, &text).await;
                        if send_json(&mut sender, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("websocket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }
}

async fn handle_client_message(state: &AppState, text: &str) -> WsReply {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            return WsReply::Error {
                code: "validation".to_string(),
                message: format!("malformed message: {}", e),
                reason: None,
            }
        }
    };

    match message {
        ClientMessage::PlaceBet {
            client_id,
            amount,
            round_id,
        } => match state.crash.place_bet(&client_id, &round_id, amount).await {
            Ok(accepted) => WsReply::BetAccepted {
                round_id: accepted.round_id,
                amount: accepted.amount,
            },
            Err(e) => error_reply(e),
        },
        ClientMessage::Cashout {
            client_id,
            round_id,
        } => match state.crash.cashout(&client_id, &round_id).await {
            Ok(receipt) => WsReply::CashoutOk {
                payout: receipt.payout,
                multiplier: receipt.multiplier,
            },
            Err(e) => error_reply(e),
        },
    }
}

fn error_reply(error: crate::errors::GameError) -> WsReply {
    WsReply::Error {
        code: error.code().to_string(),
        message: error.to_string(),
        reason: error.phase_reason().map(|r| r.to_string()),
    }
}

async fn send_json<T: Serialize>(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    value: &T,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(value).expect("event serialization cannot fail");
    sender.send(Message::Text(text)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_protocol() {
        let bet: ClientMessage = serde_json::from_str(
            r#"{"type":"placeBet","clientId":"c1","amount":100,"roundId":"r1"}"#,
        )
        .unwrap();
        assert!(matches!(bet, ClientMessage::PlaceBet { amount: 100, .. }));

        let cashout: ClientMessage =
            serde_json::from_str(r#"{"type":"cashout","clientId":"c1","roundId":"r1"}"#).unwrap();
        assert!(matches!(cashout, ClientMessage::Cashout { .. }));
    }

    #[test]
    fn test_reply_serialization() {
        let reply = WsReply::CashoutOk {
            payout: 180,
            multiplier: Multiplier::from_hundredths(180),
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "cashout:ok");
        assert_eq!(json["payout"], 180);
        assert_eq!(json["multiplier"], 1.8);
    }
}
