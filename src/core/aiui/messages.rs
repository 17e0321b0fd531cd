//! AIUI v3 message types.
//!
//! Outbound frames (client to service) carry a header, a fixed parameter block
//! describing the NLP and TTS legs, and either a text or an audio payload.
//! Inbound frames carry a response header and optional result sections whose
//! text and audio fields are base64-encoded on the wire.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Deserializer, Serialize};

use super::config::AiuiConfig;

// =============================================================================
// Constants
// =============================================================================

/// Header status of a single-shot text request.
pub const TEXT_STATUS: i32 = 3;

/// Header status marking the first audio chunk.
pub const STATUS_FIRST: i32 = 0;

/// Header status marking a middle audio chunk.
pub const STATUS_CONTINUE: i32 = 1;

/// Header status marking the last frame of a stream.
pub const STATUS_LAST: i32 = 2;

/// Stream message id used for text requests.
pub const TEXT_STMID: &str = "text-1";

/// Stream message id used for audio requests.
pub const AUDIO_STMID: &str = "audio-1";

/// Sample rate of uploaded and synthesized audio.
pub const AUDIO_SAMPLE_RATE: u32 = 16000;

/// Channel count of uploaded and synthesized audio.
pub const AUDIO_CHANNELS: u32 = 1;

/// Bit depth of uploaded and synthesized audio.
pub const AUDIO_BIT_DEPTH: u32 = 16;

// =============================================================================
// Outbound Frames
// =============================================================================

/// Interaction mode announced in the request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractMode {
    /// Single request, single answer (text turns)
    Oneshot,
    /// Streamed request (audio turns)
    Continuous,
}

/// Header present on every outbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    pub appid: String,
    pub sn: String,
    pub stmid: String,
    pub status: i32,
    pub scene: String,
    pub interact_mode: InteractMode,
}

/// Result format requested from the NLP leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NlpFormat {
    pub compress: String,
    pub format: String,
    pub encoding: String,
}

/// NLP leg parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NlpParameter {
    pub nlp: NlpFormat,
    pub new_session: bool,
}

/// Audio format requested from the TTS leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsFormat {
    pub channels: u32,
    pub bit_depth: u32,
    pub sample_rate: u32,
    pub encoding: String,
}

/// TTS leg parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsParameter {
    pub vcn: String,
    pub tts: TtsFormat,
}

/// Parameter block shared by text and audio frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestParameter {
    pub nlp: NlpParameter,
    pub tts: TtsParameter,
}

impl RequestParameter {
    /// The fixed NLP/TTS descriptors for a given voice.
    pub fn for_voice(vcn: &str) -> Self {
        Self {
            nlp: NlpParameter {
                nlp: NlpFormat {
                    compress: "raw".to_string(),
                    format: "json".to_string(),
                    encoding: "utf8".to_string(),
                },
                new_session: true,
            },
            tts: TtsParameter {
                vcn: vcn.to_string(),
                tts: TtsFormat {
                    channels: AUDIO_CHANNELS,
                    bit_depth: AUDIO_BIT_DEPTH,
                    sample_rate: AUDIO_SAMPLE_RATE,
                    encoding: "raw".to_string(),
                },
            },
        }
    }
}

/// Text payload of a single-shot request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPayload {
    pub compress: String,
    pub format: String,
    /// Base64 of the UTF-8 text
    pub text: String,
    pub encoding: String,
    pub status: i32,
}

/// Audio payload of a streamed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPayload {
    pub encoding: String,
    pub sample_rate: u32,
    pub channels: u32,
    pub bit_depth: u32,
    pub status: i32,
    /// Base64 of the PCM chunk
    pub audio: String,
}

/// Outbound payload, serialized as `{"text": {..}}` or `{"audio": {..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestPayload {
    Text(TextPayload),
    Audio(AudioPayload),
}

/// A complete outbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub header: RequestHeader,
    pub parameter: RequestParameter,
    pub payload: RequestPayload,
}

impl OutboundFrame {
    /// Serialize the frame to its JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// Frame Builder
// =============================================================================

/// Builds outbound frames from the session configuration.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    appid: String,
    sn: String,
    scene: String,
    parameter: RequestParameter,
}

impl FrameBuilder {
    pub fn new(config: &AiuiConfig) -> Self {
        Self {
            appid: config.credentials.app_id.clone(),
            sn: config.sn.clone(),
            scene: config.scene.clone(),
            parameter: RequestParameter::for_voice(&config.vcn),
        }
    }

    fn header(&self, stmid: &str, status: i32, interact_mode: InteractMode) -> RequestHeader {
        RequestHeader {
            appid: self.appid.clone(),
            sn: self.sn.clone(),
            stmid: stmid.to_string(),
            status,
            scene: self.scene.clone(),
            interact_mode,
        }
    }

    /// Single-shot text turn: status 3, mode `oneshot`.
    pub fn text_frame(&self, text: &str) -> OutboundFrame {
        OutboundFrame {
            header: self.header(TEXT_STMID, TEXT_STATUS, InteractMode::Oneshot),
            parameter: self.parameter.clone(),
            payload: RequestPayload::Text(TextPayload {
                compress: "raw".to_string(),
                format: "plain".to_string(),
                text: BASE64.encode(text.as_bytes()),
                encoding: "utf8".to_string(),
                status: TEXT_STATUS,
            }),
        }
    }

    /// One audio chunk of a streamed turn, mode `continuous`.
    pub fn audio_frame(&self, chunk: &[u8], status: i32) -> OutboundFrame {
        OutboundFrame {
            header: self.header(AUDIO_STMID, status, InteractMode::Continuous),
            parameter: self.parameter.clone(),
            payload: RequestPayload::Audio(AudioPayload {
                encoding: "raw".to_string(),
                sample_rate: AUDIO_SAMPLE_RATE,
                channels: AUDIO_CHANNELS,
                bit_depth: AUDIO_BIT_DEPTH,
                status,
                audio: BASE64.encode(chunk),
            }),
        }
    }
}

// =============================================================================
// Inbound Frames
// =============================================================================

/// Deserialize a base64 string (or null / missing) into raw bytes.
fn base64_bytes<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded: Option<String> = Option::deserialize(deserializer)?;
    match encoded {
        Some(encoded) if !encoded.is_empty() => BASE64
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom),
        _ => Ok(Vec::new()),
    }
}

/// Deserialize a value that may be `null` into its default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Header present on every inbound frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResponseHeader {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub stmid: String,
    #[serde(default)]
    pub status: i32,
}

/// A text result section (`event`, `iat`, `cbm_semantic`, `nlp`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TextSection {
    #[serde(default)]
    pub compress: String,
    #[serde(default)]
    pub encoding: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub seq: i64,
    #[serde(default)]
    pub status: i32,
    #[serde(default, alias = "Text", deserialize_with = "base64_bytes")]
    pub text: Vec<u8>,
}

impl TextSection {
    /// The decoded text, with invalid UTF-8 replaced.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }
}

/// A synthesized audio section (`tts`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AudioSection {
    #[serde(default)]
    pub compress: String,
    #[serde(default)]
    pub encoding: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub seq: i64,
    #[serde(default)]
    pub status: i32,
    #[serde(default, deserialize_with = "base64_bytes")]
    pub audio: Vec<u8>,
}

/// Optional result sections of an inbound frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResponsePayload {
    #[serde(default)]
    pub event: Option<TextSection>,
    #[serde(default)]
    pub iat: Option<TextSection>,
    #[serde(default)]
    pub cbm_semantic: Option<TextSection>,
    #[serde(default)]
    pub nlp: Option<TextSection>,
    #[serde(default)]
    pub tts: Option<AudioSection>,
}

/// A complete inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundResponse {
    pub header: ResponseHeader,
    #[serde(default, deserialize_with = "null_as_default")]
    pub payload: ResponsePayload,
}

impl InboundResponse {
    /// Parse a raw inbound frame.
    pub fn parse(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Whether this frame ends the session successfully.
    pub fn is_last(&self) -> bool {
        self.header.status == STATUS_LAST
    }
}

// =============================================================================
// Nested Documents
// =============================================================================

/// Answer block of a semantic result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SemanticAnswer {
    #[serde(default)]
    pub text: Option<String>,
}

/// The JSON document carried inside a `cbm_semantic` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SemanticResult {
    pub rc: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub answer: Option<SemanticAnswer>,
}

impl SemanticResult {
    pub fn parse(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// A skill matched.
    pub fn is_hit(&self) -> bool {
        self.rc == 0
    }

    pub fn answer_text(&self) -> Option<&str> {
        self.answer.as_ref().and_then(|a| a.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct RecognitionWord {
    #[serde(default)]
    w: String,
}

#[derive(Debug, Deserialize)]
struct RecognitionCandidate {
    #[serde(default)]
    cw: Vec<RecognitionWord>,
}

#[derive(Debug, Deserialize)]
struct RecognitionText {
    #[serde(default)]
    ws: Vec<RecognitionCandidate>,
}

#[derive(Debug, Deserialize)]
struct RecognitionDocument {
    text: RecognitionText,
}

/// Extract the recognized words from an `iat` document.
///
/// The document has the shape `{"text":{"ws":[{"cw":[{"w":".."}]}]}}`; the
/// first candidate of each word is concatenated. Anything else is returned as is.
pub fn extract_recognized_text(raw: &str) -> String {
    match serde_json::from_str::<RecognitionDocument>(raw) {
        Ok(doc) => doc
            .text
            .ws
            .iter()
            .filter_map(|ws| ws.cw.first())
            .map(|cw| cw.w.as_str())
            .collect(),
        Err(_) => raw.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
