//! AIUI v3 streaming session client.
//!
//! This module drives one interaction with the AIUI v3 speech service over an
//! authenticated WebSocket: a text turn or a paced stream of PCM audio goes
//! up, while recognition, skill, dialogue and synthesized audio results come
//! back on the same connection.
//!
//! # Features
//!
//! - HMAC-SHA256 signed handshake URL (`host`, `date`, `authorization`)
//! - Single-shot text turns and paced 16 kHz / 16-bit / mono audio uploads
//! - Concurrent send and receive tasks with first-error reporting
//! - Decoding of `event`, `iat`, `cbm_semantic`, `nlp` and `tts` sections
//! - Sequence-ordered reassembly of synthesized audio into `<sid>.<ext>`
//!
//! # Architecture
//!
//! ```text
//!                    ┌───────────────┐
//!  SessionPayload ──▶│  SendDriver   │──▶ FrameWriter ──┐
//!                    └───────────────┘                  │
//!                                                       ▼
//!                                                 AIUI service
//!                                                       │
//!                    ┌───────────────┐                  │
//!  SessionEvent  ◀───│ReceiveDemuxer │◀── FrameReader ◀─┘
//!                    └───────┬───────┘
//!                            ▼
//!                    AudioReassembler ──▶ AudioSink (<sid>.pcm)
//! ```
//!
//! # Configuration
//!
//! ```bash
//! export AIUI_APP_ID="your-app-id"
//! export AIUI_API_KEY="your-api-key"
//! export AIUI_API_SECRET="your-api-secret"
//! export AIUI_SCENE="main_box"   # Optional
//! ```

mod audio;
mod auth;
mod base;
mod config;
mod messages;
mod receiver;
mod sender;
mod session;
mod source;
mod transport;


pub use audio::{
    AudioReassembler, AudioSink, AudioStream, FileAudioSink, MemoryAudioSink, extension_for,
};
pub use auth::{RequestSigner, canonical_string, format_http_date, hmac_sha256_base64, sign};
pub use base::{
    AiuiError, AiuiResult, AudioOutputInfo, SemanticOutcome, SessionEvent, SessionEventCallback,
    SessionReport,
};
pub use config::{
    AIUI_V3_URL, AiuiConfig, AiuiCredentials, DEFAULT_FRAME_INTERVAL, DEFAULT_FRAME_SIZE,
    DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_SCENE, DEFAULT_SN, DEFAULT_VCN,
};
pub use messages::{
    AudioPayload, AudioSection, FrameBuilder, InboundResponse, InteractMode, OutboundFrame,
    RequestHeader, RequestParameter, RequestPayload, ResponseHeader, ResponsePayload,
    STATUS_CONTINUE, STATUS_FIRST, STATUS_LAST, SemanticResult, TEXT_STATUS, TextPayload,
    TextSection, extract_recognized_text,
};
pub use receiver::{ReceiveDemuxer, decode_semantic};
pub use sender::{SendDriver, SessionPayload, chunk_count, chunk_status};
pub use session::AiuiSession;
pub use source::{AudioSource, FileAudioSource, MemoryAudioSource};
pub use transport::{AiuiTransport, FrameReader, FrameWriter, WsFrameReader, WsFrameWriter};
