//! WebSocket transport for AIUI sessions.
//!
//! The handshake yields two independently owned halves: a [`FrameWriter`] for
//! the send driver and a [`FrameReader`] for the receive demultiplexer. Both
//! halves are traits so the session can run over in-memory transports in tests.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{self, protocol::Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace};

use super::base::{AiuiError, AiuiResult};
use super::messages::OutboundFrame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// Traits
// =============================================================================

/// Outbound half of a session transport.
#[async_trait]
pub trait FrameWriter: Send {
    /// Serialize and send one frame.
    async fn send(&mut self, frame: &OutboundFrame) -> AiuiResult<()>;

    /// Close the outbound half.
    async fn close(&mut self) -> AiuiResult<()>;
}

/// Inbound half of a session transport.
#[async_trait]
pub trait FrameReader: Send {
    /// Receive the next data frame.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection.
    async fn receive(&mut self) -> AiuiResult<Option<Bytes>>;
}

// =============================================================================
// WebSocket Implementation
// =============================================================================

/// Writer half backed by a tokio-tungstenite sink.
pub struct WsFrameWriter {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameWriter for WsFrameWriter {
    async fn send(&mut self, frame: &OutboundFrame) -> AiuiResult<()> {
        let json = frame
            .to_json()
            .map_err(|e| AiuiError::Transport(format!("failed to serialize frame: {e}")))?;
        trace!(status = frame.header.status, bytes = json.len(), "Sending frame");

        self.sink
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| AiuiError::Transport(format!("failed to send frame: {e}")))
    }

    async fn close(&mut self) -> AiuiResult<()> {
        self.sink
            .close()
            .await
            .map_err(|e| AiuiError::Transport(format!("failed to close connection: {e}")))
    }
}

/// Reader half backed by a tokio-tungstenite stream.
pub struct WsFrameReader {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FrameReader for WsFrameReader {
    async fn receive(&mut self) -> AiuiResult<Option<Bytes>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(Bytes::copy_from_slice(text.as_bytes())));
                }
                Some(Ok(Message::Binary(data))) => return Ok(Some(data)),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    trace!("Skipping ping/pong");
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("Peer closed connection: {:?}", frame);
                    return Ok(None);
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => {
                    return Err(AiuiError::Transport(format!("failed to read frame: {e}")));
                }
                None => return Ok(None),
            }
        }
    }
}

// =============================================================================
// Handshake
// =============================================================================

/// Establishes signed WebSocket connections.
pub struct AiuiTransport;

impl AiuiTransport {
    /// Upgrade `url` (already signed) to a WebSocket, bounded by `limit`.
    pub async fn handshake(
        url: &str,
        limit: Duration,
    ) -> AiuiResult<(WsFrameWriter, WsFrameReader)> {
        let target = redact_query(url);
        info!("Connecting to AIUI at {}", target);

        let connect_result = match timeout(limit, connect_async(url)).await {
            Ok(result) => result,
            Err(_) => {
                let err = AiuiError::Handshake {
                    status: None,
                    body: None,
                    message: format!("connection to {target} timed out after {limit:?}"),
                };
                error!("{}", err);
                return Err(err);
            }
        };

        let (ws_stream, response) = connect_result.map_err(|e| {
            let err = handshake_error(e);
            error!("{}", err);
            err
        })?;

        debug!(status = response.status().as_u16(), "WebSocket upgrade complete");
        let (sink, stream) = ws_stream.split();
        Ok((WsFrameWriter { sink }, WsFrameReader { stream }))
    }
}

/// Map a failed upgrade to a handshake error, keeping the HTTP status and body.
fn handshake_error(error: tungstenite::Error) -> AiuiError {
    match error {
        tungstenite::Error::Http(response) => {
            let status = response.status();
            let body = response
                .body()
                .as_ref()
                .map(|b| String::from_utf8_lossy(b).into_owned());
            AiuiError::Handshake {
                status: Some(status.as_u16()),
                body,
                message: format!("upgrade rejected with HTTP {status}"),
            }
        }
        other => AiuiError::Handshake {
            status: None,
            body: None,
            message: format!("failed to connect: {other}"),
        },
    }
}

/// Strip the query (which carries the authorization) for logging.
fn redact_query(url: &str) -> &str {
    url.split_once('?').map(|(base, _)| base).unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_query() {
        assert_eq!(
            redact_query("wss://aiui.xf-yun.com/v3/aiint/sos?authorization=abc&date=d"),
            "wss://aiui.xf-yun.com/v3/aiint/sos"
        );
        assert_eq!(redact_query("ws://localhost/x"), "ws://localhost/x");
    }

    #[tokio::test]
    async fn test_handshake_refused() {
        // Bind then drop to get a port with no listener.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result =
            AiuiTransport::handshake(&format!("ws://{addr}/v3/aiint/sos"), Duration::from_secs(2))
                .await;
        match result {
            Err(AiuiError::Handshake { status, .. }) => assert!(status.is_none()),
            Err(other) => panic!("Expected handshake error, got {other:?}"),
            Ok(_) => panic!("Expected handshake error, got a connection"),
        }
    }

    #[tokio::test]
    async fn test_handshake_timeout() {
        // Accepts TCP but never answers the upgrade.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let result =
            AiuiTransport::handshake(&format!("ws://{addr}/"), Duration::from_millis(200)).await;
        match result {
            Err(AiuiError::Handshake {
                status, message, ..
            }) => {
                assert!(status.is_none());
                assert!(message.contains("timed out"));
            }
            Err(other) => panic!("Expected handshake error, got {other:?}"),
            Ok(_) => panic!("Expected handshake error, got a connection"),
        }
    }
}
