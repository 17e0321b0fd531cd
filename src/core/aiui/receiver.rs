//! Inbound half of a session.
//!
//! Reads frames until the service marks the session complete (`status == 2`),
//! reports an error (`code != 0`), or the connection fails. Non-audio sections
//! are logged and forwarded as [`SessionEvent`]s; TTS chunks go to the
//! [`AudioReassembler`].

use std::time::Duration;

use bytes::Bytes;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::audio::AudioReassembler;
use super::base::{
    AiuiError, AiuiResult, AudioOutputInfo, SemanticOutcome, SessionEvent, SessionEventCallback,
};
use super::messages::{
    InboundResponse, STATUS_LAST, SemanticResult, TextSection, extract_recognized_text,
};
use super::transport::FrameReader;

/// Decode a `cbm_semantic` section. Never fails.
pub fn decode_semantic(section: &TextSection) -> SemanticOutcome {
    let raw = section.text_lossy();
    match SemanticResult::parse(&section.text) {
        Ok(result) if result.is_hit() => SemanticOutcome::Hit {
            answer: result.answer_text().map(str::to_string),
            text: result.text,
            category: result.category,
        },
        Ok(_) => SemanticOutcome::Miss(raw),
        Err(e) => {
            debug!("Semantic section is not a result document: {}", e);
            SemanticOutcome::Raw(raw)
        }
    }
}

/// Consumes inbound frames for one session.
pub struct ReceiveDemuxer<R: FrameReader> {
    reader: R,
    reassembler: AudioReassembler,
    callback: Option<SessionEventCallback>,
    idle_timeout: Option<Duration>,
    sid: Option<String>,
}

impl<R: FrameReader> ReceiveDemuxer<R> {
    pub fn new(reader: R, reassembler: AudioReassembler) -> Self {
        Self {
            reader,
            reassembler,
            callback: None,
            idle_timeout: None,
            sid: None,
        }
    }

    pub fn with_callback(mut self, callback: Option<SessionEventCallback>) -> Self {
        self.callback = callback;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Last session id seen on an inbound frame.
    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    /// Summary of the reassembled audio, once the output has been closed.
    pub fn audio_output(&self) -> Option<AudioOutputInfo> {
        self.reassembler.output()
    }

    /// Run until the session completes or fails.
    pub async fn run(&mut self) -> AiuiResult<()> {
        loop {
            let raw = match self.next_frame().await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    warn!("Connection closed before the final frame");
                    self.reassembler.finalize().await;
                    return Err(AiuiError::ConnectionClosed);
                }
                Err(e) => {
                    error!("Receive failed: {}", e);
                    self.reassembler.finalize().await;
                    return Err(e);
                }
            };

            let response = match InboundResponse::parse(&raw) {
                Ok(response) => response,
                Err(e) => {
                    error!("Failed to decode inbound frame: {}", e);
                    self.reassembler.finalize().await;
                    return Err(AiuiError::Decode(e.to_string()));
                }
            };

            let header = &response.header;
            if !header.sid.is_empty() {
                self.sid = Some(header.sid.clone());
            }

            if header.code != 0 {
                error!(
                    code = header.code,
                    sid = %header.sid,
                    "Service error: {}",
                    header.message
                );
                return Err(AiuiError::Protocol {
                    code: header.code,
                    message: header.message.clone(),
                    raw: String::from_utf8_lossy(&raw).into_owned(),
                });
            }

            self.dispatch(&response).await;

            if response.header.status == STATUS_LAST {
                info!(sid = %response.header.sid, "Session complete");
                self.reassembler.finalize().await;
                return Ok(());
            }
        }
    }

    async fn next_frame(&mut self) -> AiuiResult<Option<Bytes>> {
        match self.idle_timeout {
            Some(limit) => timeout(limit, self.reader.receive()).await.map_err(|_| {
                AiuiError::Transport(format!("no frame received within {limit:?}"))
            })?,
            None => self.reader.receive().await,
        }
    }

    async fn dispatch(&mut self, response: &InboundResponse) {
        let payload = &response.payload;

        if let Some(event) = &payload.event {
            let text = event.text_lossy();
            info!("event: {}", text);
            self.emit(SessionEvent::Event(text)).await;
        }

        if let Some(iat) = &payload.iat {
            let raw = iat.text_lossy();
            let text = extract_recognized_text(&raw);
            info!(status = iat.status, "iat: {}", text);
            self.emit(SessionEvent::Recognition {
                text,
                raw,
                is_final: iat.status == STATUS_LAST,
            })
            .await;
        }

        if let Some(semantic) = &payload.cbm_semantic {
            let outcome = decode_semantic(semantic);
            match &outcome {
                SemanticOutcome::Hit {
                    text,
                    category,
                    answer,
                } => info!(
                    text = text.as_deref().unwrap_or(""),
                    category = category.as_deref().unwrap_or(""),
                    answer = answer.as_deref().unwrap_or(""),
                    "Skill hit"
                ),
                SemanticOutcome::Miss(raw) | SemanticOutcome::Raw(raw) => {
                    info!("cbm_semantic: {}", raw)
                }
            }
            self.emit(SessionEvent::Semantic(outcome)).await;
        }

        if let Some(nlp) = &payload.nlp {
            let text = nlp.text_lossy();
            info!("nlp: {}", text);
            self.emit(SessionEvent::Dialogue(text)).await;
        }

        if let Some(tts) = &payload.tts {
            debug!(
                sid = %response.header.sid,
                seq = tts.seq,
                status = tts.status,
                len = tts.audio.len(),
                "tts chunk"
            );
            self.reassembler
                .accept(&response.header.sid, &tts.encoding, tts.seq, &tts.audio)
                .await;
        }
    }

    async fn emit(&mut self, event: SessionEvent) {
        if let Some(callback) = &self.callback {
            callback(event).await;
        }
    }
}
