//! WebSocket Mock Server for the AIUI v3 endpoint

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::accept_hdr_async;

/// One scripted server action, run after the client's last upload frame
#[derive(Debug, Clone)]
pub enum MockStep {
    Send(Value),
    Raw(String),
    Delay(Duration),
    Close,
}

/// WebSocket Mock Server State
#[derive(Default)]
pub struct AiuiMockState {
    pub script: Vec<MockStep>,
    /// Reject the upgrade with this status and body
    pub reject: Option<(u16, String)>,
    /// Query string of the last upgrade request
    pub request_query: Mutex<Option<String>>,
    /// Uploaded frames, in order
    pub received: Mutex<Vec<Value>>,
    pub connection_count: AtomicU64,
}

impl AiuiMockState {
    pub fn scripted(script: Vec<MockStep>) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    pub fn rejecting(status: u16, body: &str) -> Self {
        Self {
            reject: Some((status, body.to_string())),
            ..Default::default()
        }
    }

    /// Header statuses of the uploaded frames
    pub fn received_statuses(&self) -> Vec<i64> {
        self.received
            .lock()
            .iter()
            .map(|f| f["header"]["status"].as_i64().unwrap_or(-1))
            .collect()
    }
}

/// Handle a single AIUI session
async fn handle_connection(
    stream: TcpStream,
    state: Arc<AiuiMockState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let callback_state = state.clone();
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        *callback_state.request_query.lock() = req.uri().query().map(str::to_string);
        match &callback_state.reject {
            Some((status, body)) => Err(http::Response::builder()
                .status(*status)
                .body(Some(body.clone()))
                .expect("valid error response")),
            None => Ok(resp),
        }
    };

    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        // Rejected upgrades end here
        Err(_) => return Ok(()),
    };
    let (mut write, mut read) = ws_stream.split();
    state.connection_count.fetch_add(1, Ordering::Relaxed);

    // Collect the upload until its last frame (status 2 audio, status 3 text)
    while let Some(msg) = read.next().await {
        match msg? {
            Message::Text(text) => {
                let frame: Value = serde_json::from_str(&text)?;
                let status = frame["header"]["status"].as_i64().unwrap_or(-1);
                state.received.lock().push(frame);
                if status == 2 || status == 3 {
                    break;
                }
            }
            Message::Close(_) => return Ok(()),
            Message::Ping(data) => write.send(Message::Pong(data)).await?,
            _ => {}
        }
    }

    for step in &state.script {
        match step {
            MockStep::Send(value) => write.send(Message::Text(value.to_string().into())).await?,
            MockStep::Raw(text) => write.send(Message::Text(text.clone().into())).await?,
            MockStep::Delay(d) => tokio::time::sleep(*d).await,
            MockStep::Close => {
                write.send(Message::Close(None)).await?;
                return Ok(());
            }
        }
    }

    // Wait for the client to hang up
    while let Some(Ok(msg)) = read.next().await {
        if let Message::Close(_) = msg {
            break;
        }
    }
    Ok(())
}

/// A running mock server bound to an ephemeral port
pub struct AiuiMockServer {
    pub addr: SocketAddr,
    pub state: Arc<AiuiMockState>,
    handle: tokio::task::JoinHandle<()>,
}

impl AiuiMockServer {
    /// Spawn the mock in the background
    pub async fn spawn(state: AiuiMockState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock listener");
        let addr = listener.local_addr().expect("listener has an address");
        let state = Arc::new(state);

        let server_state = state.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let state = server_state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, state).await {
                        eprintln!("AIUI mock connection error: {}", e);
                    }
                });
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Endpoint URL without the signature query
    pub fn base_url(&self) -> String {
        format!("ws://{}/v3/aiint/sos", self.addr)
    }
}

impl Drop for AiuiMockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
