//! Session orchestration.
//!
//! A session signs the endpoint, completes the handshake, then runs the send
//! driver and the receive demultiplexer as two tasks that progress on their
//! own. Neither task cancels the other; the session ends once both finish and
//! reports the first fatal error either of them hit.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::audio::{AudioReassembler, AudioSink};
use super::auth::RequestSigner;
use super::base::{AiuiError, AiuiResult, FirstError, SessionEventCallback, SessionReport};
use super::config::AiuiConfig;
use super::messages::FrameBuilder;
use super::receiver::ReceiveDemuxer;
use super::sender::{SendDriver, SessionPayload};
use super::transport::{AiuiTransport, FrameReader, FrameWriter};

/// One AIUI interaction over one connection.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use aiui_session::core::aiui::{
///     AiuiConfig, AiuiCredentials, AiuiSession, FileAudioSink, SessionPayload,
/// };
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = AiuiConfig::new(AiuiCredentials::new("appid", "key", "secret"));
///
///     let report = AiuiSession::new(config)
///         .on_event(Arc::new(|event| {
///             Box::pin(async move {
///                 println!("{event}");
///             })
///         }))
///         .run(
///             SessionPayload::Text("你是谁".to_string()),
///             Arc::new(FileAudioSink::new(".")),
///         )
///         .await?;
///
///     println!("sid: {:?}", report.sid);
///     Ok(())
/// }
/// ```
pub struct AiuiSession {
    config: AiuiConfig,
    callback: Option<SessionEventCallback>,
}

impl AiuiSession {
    pub fn new(config: AiuiConfig) -> Self {
        Self {
            config,
            callback: None,
        }
    }

    /// Register a callback for decoded non-audio sections.
    pub fn on_event(mut self, callback: SessionEventCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn config(&self) -> &AiuiConfig {
        &self.config
    }

    /// Sign, connect and run the session to completion.
    ///
    /// Signing and handshake failures are returned before any task starts.
    pub async fn run(
        self,
        payload: SessionPayload,
        sink: Arc<dyn AudioSink>,
    ) -> AiuiResult<SessionReport> {
        self.config.validate()?;

        let signer = RequestSigner::new(
            self.config.credentials.api_key.as_str(),
            self.config.credentials.api_secret.as_str(),
        );
        let url = signer.sign(&self.config.base_url)?;
        let (writer, reader) =
            AiuiTransport::handshake(&url, self.config.handshake_timeout).await?;

        self.run_over(writer, reader, payload, sink).await
    }

    /// Run the session over an already established transport.
    pub async fn run_over<W, R>(
        self,
        writer: W,
        reader: R,
        payload: SessionPayload,
        sink: Arc<dyn AudioSink>,
    ) -> AiuiResult<SessionReport>
    where
        W: FrameWriter + 'static,
        R: FrameReader + 'static,
    {
        let first_error = FirstError::default();

        let mut driver = SendDriver::new(
            writer,
            FrameBuilder::new(&self.config),
            self.config.frame_size,
            self.config.frame_interval,
        );
        let mut demuxer = ReceiveDemuxer::new(reader, AudioReassembler::new(sink))
            .with_callback(self.callback)
            .with_idle_timeout(self.config.idle_timeout);

        let send_errors = first_error.clone();
        let send_task = tokio::spawn(async move {
            let sent = match driver.run(payload).await {
                Ok(sent) => sent,
                Err(e) => {
                    error!("Send failed: {}", e);
                    send_errors.record(e);
                    0
                }
            };
            (sent, driver.into_writer())
        });

        let receive_errors = first_error.clone();
        let receive_task = tokio::spawn(async move {
            if let Err(e) = demuxer.run().await {
                receive_errors.record(e);
            }
            demuxer
        });

        let (send_result, receive_result) = tokio::join!(send_task, receive_task);

        let mut report = SessionReport::default();
        match send_result {
            Ok((sent, mut writer)) => {
                report.frames_sent = sent;
                if let Err(e) = writer.close().await {
                    debug!("Ignoring close failure: {}", e);
                }
            }
            Err(e) => first_error.record(AiuiError::TaskFailed(format!("send task: {e}"))),
        }
        match receive_result {
            Ok(demuxer) => {
                report.sid = demuxer.sid().map(str::to_string);
                report.audio_output = demuxer.audio_output();
            }
            Err(e) => first_error.record(AiuiError::TaskFailed(format!("receive task: {e}"))),
        }

        if let Some(e) = first_error.take() {
            return Err(e);
        }

        info!(
            frames_sent = report.frames_sent,
            sid = report.sid.as_deref().unwrap_or(""),
            "Session finished"
        );
        Ok(report)
    }
}
