//! WebSocket endpoint bridging sockets onto the poll hub.
//!
//! ## High-level flow
//! Identity is resolved **once**, from the Cookie header of the upgrade
//! request: a connection is Anonymous or Identified for its entire life, and
//! signing in mid-connection requires reconnecting. After the upgrade the
//! socket is registered with the hub, which immediately queues the current
//! tally, so the first frame every client sees is a `results` snapshot.
//!
//! ## Frame protocol
//! JSON text frames tagged with `type`:
//! - client -> server: `{"type":"vote","value":"yes"|"no"}` and
//!   `{"type":"get_results"}`
//! - server -> client: `{"type":"results",...}` and
//!   `{"type":"error_msg","message":...}`
//!
//! Frames that fail to parse are dropped, mirroring the hub's policy for
//! unknown vote tokens. Binary and ping/pong frames carry nothing for us; the
//! transport answers pings on its own.
//!
//! ## Buffering and drops
//! Hub events arrive on a bounded per-connection queue filled with
//! `try_send`; a connection that cannot keep up loses frames locally instead
//! of stalling the vote path. This loop only adds the network write on top.
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderMap, header};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use livepoll_hub::{Connection, HubEvent, PollHub, Tally, Voter};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::resolver::resolve_identity;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Vote { value: String },
    GetResults,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Results(Tally),
    ErrorMsg { message: String },
}

impl From<HubEvent> for ServerMessage {
    fn from(event: HubEvent) -> Self {
        match event {
            HubEvent::Results(tally) => ServerMessage::Results(tally),
            HubEvent::Error(message) => ServerMessage::ErrorMsg { message },
        }
    }
}

pub(crate) async fn poll_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok());
    let voter = resolve_identity(state.verifier.as_ref(), cookie_header);
    ws.on_upgrade(move |socket| drive_socket(socket, state.hub, voter))
}

async fn drive_socket(socket: WebSocket, hub: PollHub, voter: Option<Voter>) {
    let voter_id = voter.as_ref().map(|v| v.id.clone());
    let mut conn = match hub.connect(voter).await {
        Ok(conn) => conn,
        Err(err) => {
            tracing::warn!(error = %err, "closing socket, poll hub unavailable");
            return;
        }
    };
    metrics::counter!("livepoll_sockets_opened_total").increment(1);
    tracing::debug!(voter = ?voter_id, "poll socket opened");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            event = conn.recv() => {
                let Some(event) = event else { break };
                let frame = ServerMessage::from(event);
                let Ok(text) = serde_json::to_string(&frame) else { continue };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => handle_frame(&conn, text.as_str()).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::debug!(error = %err, "poll socket read failed");
                        break;
                    }
                }
            }
        }
    }
    tracing::debug!(voter = ?voter_id, "poll socket closed");
    // Dropping `conn` unregisters the connection; recorded votes keep
    // counting.
}

async fn handle_frame(conn: &Connection, raw: &str) {
    match serde_json::from_str::<ClientMessage>(raw) {
        Ok(ClientMessage::Vote { value }) => conn.submit_vote(&value).await,
        Ok(ClientMessage::GetResults) => conn.request_results().await,
        // Unparseable frames are dropped, same as unknown vote tokens.
        Err(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_parse() {
        let vote: ClientMessage =
            serde_json::from_str(r#"{"type":"vote","value":"yes"}"#).expect("vote");
        assert_eq!(
            vote,
            ClientMessage::Vote {
                value: "yes".to_string()
            }
        );

        let get: ClientMessage = serde_json::from_str(r#"{"type":"get_results"}"#).expect("get");
        assert_eq!(get, ClientMessage::GetResults);
    }

    #[test]
    fn unknown_client_frames_fail_to_parse() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"shout"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>("not json").is_err());
        // A vote frame without a value is malformed too.
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"vote"}"#).is_err());
    }

    #[test]
    fn results_frame_carries_the_tally_fields() {
        let frame = ServerMessage::from(HubEvent::Results(Tally::compute(1, 2)));
        let value = serde_json::to_value(&frame).expect("serialize");
        assert_eq!(value["type"], "results");
        assert_eq!(value["yes"], 1);
        assert_eq!(value["no"], 2);
        assert_eq!(value["total"], 3);
        assert_eq!(value["pYes"], 33);
        assert_eq!(value["pNo"], 67);
    }

    #[test]
    fn error_frame_carries_the_message() {
        let frame = ServerMessage::from(HubEvent::Error("you must be signed in to vote".into()));
        let value = serde_json::to_value(&frame).expect("serialize");
        assert_eq!(value["type"], "error_msg");
        assert_eq!(value["message"], "you must be signed in to vote");
    }
}
