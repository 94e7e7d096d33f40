//! Connection driver for one streaming chat call
//!
//! One call maps to one WebSocket connection: connect with a signed URL,
//! send the single request frame, then read response frames until the
//! terminal status arrives. Decoded partials are handed to the consumer
//! through a channel in arrival order; the driver never reorders or
//! buffers past the channel capacity.

use crate::client::wire::{self, STATUS_TERMINAL};
use crate::error::{SparkError, SparkResult};
use crate::protocol::types::StreamedChatResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use std::pin::Pin;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Lazy sequence of partial results for one call. A terminal `Err` ends
/// the stream; partials already yielded before it remain valid.
pub type ChatStream = Pin<Box<dyn Stream<Item = SparkResult<StreamedChatResponse>> + Send>>;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Reason sent in the normal-closure frame after the terminal response
const CLOSE_REASON: &str = "client finished reading response";

/// Frames buffered between the driver task and the consumer
const CHANNEL_CAPACITY: usize = 32;

/// Open a connection, send the request frame and return the response
/// stream.
///
/// Connect and send failures surface here, before any stream exists.
/// `cancellation` is observed at the connect, send and every receive;
/// a cancelled call ends with [`SparkError::Cancelled`] after whatever
/// partials were already delivered.
pub(crate) async fn open_stream(
    signed_url: String,
    request_json: String,
    cancellation: CancellationToken,
) -> SparkResult<ChatStream> {
    let (ws, _handshake_response) = tokio::select! {
        _ = cancellation.cancelled() => return Err(SparkError::Cancelled),
        connected = connect_async(signed_url.as_str()) => connected
            .map_err(|e| SparkError::Connection(e.to_string()))?,
    };
    debug!("websocket connected");

    let (mut writer, reader) = ws.split();
    tokio::select! {
        _ = cancellation.cancelled() => return Err(SparkError::Cancelled),
        sent = writer.send(Message::Text(request_json)) => sent
            .map_err(|e| SparkError::Transport(format!("failed to send request frame: {}", e)))?,
    }
    debug!("request frame sent");

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(drive(writer, reader, tx, cancellation));
    Ok(Box::pin(ReceiverStream::new(rx)))
}

/// Receive loop. Yields every decoded partial before checking termination,
/// so consumers observe each frame exactly once, in arrival order, before
/// the stream ends.
async fn drive(
    writer: WsWriter,
    mut reader: WsReader,
    tx: mpsc::Sender<SparkResult<StreamedChatResponse>>,
    cancellation: CancellationToken,
) {
    let mut last_seq: i64 = -1;

    loop {
        let frame = tokio::select! {
            _ = cancellation.cancelled() => {
                // Hard stop: no close handshake, the connection is dropped.
                debug!("call cancelled mid-stream");
                let _ = tx.send(Err(SparkError::Cancelled)).await;
                return;
            }
            frame = reader.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(raw))) => match wire::decode_frame(&raw) {
                Ok(decoded) => {
                    if decoded.seq < last_seq {
                        warn!(
                            seq = decoded.seq,
                            last_seq, "sequence number regressed; delivering in arrival order"
                        );
                    }
                    last_seq = decoded.seq;

                    let status = decoded.status;
                    if tx.send(Ok(decoded.response)).await.is_err() {
                        // Consumer dropped the stream; release the connection.
                        debug!("consumer gone, abandoning connection");
                        return;
                    }
                    if status == STATUS_TERMINAL {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            },
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) => {
                let _ = tx
                    .send(Err(SparkError::protocol(
                        "connection closed before the terminal frame",
                    )))
                    .await;
                return;
            }
            Some(Ok(other)) => {
                let _ = tx
                    .send(Err(SparkError::protocol(format!(
                        "unexpected {} frame while waiting for a text frame",
                        frame_kind(&other)
                    ))))
                    .await;
                return;
            }
            Some(Err(e)) => {
                let _ = tx
                    .send(Err(SparkError::Transport(format!(
                        "failed to receive frame: {}",
                        e
                    ))))
                    .await;
                return;
            }
            None => {
                let _ = tx
                    .send(Err(SparkError::protocol(
                        "connection ended before the terminal frame",
                    )))
                    .await;
                return;
            }
        }
    }

    close_connection(writer, reader).await;
}

/// Best-effort normal closure after the terminal frame. Close errors are
/// logged and never escalated.
async fn close_connection(writer: WsWriter, reader: WsReader) {
    let mut ws = match writer.reunite(reader) {
        Ok(ws) => ws,
        Err(_) => return,
    };
    let close = CloseFrame {
        code: CloseCode::Normal,
        reason: CLOSE_REASON.into(),
    };
    if let Err(e) = ws.close(Some(close)).await {
        debug!("close handshake failed: {}", e);
    } else {
        debug!("connection closed");
    }
}

fn frame_kind(message: &Message) -> &'static str {
    match message {
        Message::Text(_) => "text",
        Message::Binary(_) => "binary",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "raw",
    }
}
