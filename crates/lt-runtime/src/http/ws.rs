//! `/ws` endpoint: upgrades viewers and hands them to a connection pump.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{future, SinkExt, StreamExt};
use lt_02_live_hub::Frame;
use tracing::warn;

use super::AppState;

/// WebSocket upgrade handler
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if !state.hub.is_accepting() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    }
    ws.on_upgrade(move |socket| serve_viewer(socket, state))
}

async fn serve_viewer(mut socket: WebSocket, state: AppState) {
    let connection = match state.hub.join().await {
        Ok(connection) => connection,
        Err(e) => {
            warn!(error = %e, "Rejecting viewer");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let (sink, stream) = socket.split();
    let sink = sink.with(|frame: Frame| future::ready(Ok::<_, axum::Error>(frame_to_message(frame))));
    let stream = stream.map(|message| message.map(message_to_frame));

    state.pump.run(connection, sink, stream).await;
}

/// UTF-8 payloads go out as text frames, anything else as binary.
pub fn frame_to_message(frame: Frame) -> Message {
    match frame {
        Frame::Payload(payload) => match String::from_utf8(payload.to_vec()) {
            Ok(text) => Message::Text(text),
            Err(e) => Message::Binary(e.into_bytes()),
        },
        Frame::Ping(data) => Message::Ping(data.to_vec()),
        Frame::Pong(data) => Message::Pong(data.to_vec()),
        Frame::Close => Message::Close(None),
    }
}

pub fn message_to_frame(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Payload(Bytes::from(text)),
        Message::Binary(data) => Frame::Payload(Bytes::from(data)),
        Message::Ping(data) => Frame::Ping(Bytes::from(data)),
        Message::Pong(data) => Frame::Pong(Bytes::from(data)),
        Message::Close(_) => Frame::Close,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_payload_becomes_text() {
        let message = frame_to_message(Frame::Payload(Bytes::from_static(br#"{"level":"info"}"#)));
        assert_eq!(message, Message::Text(r#"{"level":"info"}"#.to_string()));
    }

    #[test]
    fn test_binary_payload_stays_binary() {
        let message = frame_to_message(Frame::Payload(Bytes::from_static(&[0xff, 0x00])));
        assert_eq!(message, Message::Binary(vec![0xff, 0x00]));
    }

    #[test]
    fn test_control_frames_map_both_ways() {
        assert_eq!(message_to_frame(Message::Close(None)), Frame::Close);
        assert_eq!(message_to_frame(Message::Pong(vec![1])), Frame::Pong(Bytes::from_static(&[1])));
        assert!(matches!(frame_to_message(Frame::Ping(Bytes::new())), Message::Ping(_)));
    }
}
