//! Mock AIUI Service
//!
//! Simulates the AIUI v3 WebSocket endpoint with scripted behaviour:
//! - Records the signed handshake query and every uploaded frame
//! - Replies with a scripted sequence of result frames once the upload ends
//! - Rejects the upgrade with an HTTP status when configured
//! - Drops the connection mid-stream

// Not every test binary uses every helper
#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};

pub mod websocket_mock;

pub use websocket_mock::{AiuiMockServer, AiuiMockState, MockStep};

/// Session id used by scripted responses
pub const MOCK_SID: &str = "ara00010001@dx18c8f0b1a2b3c4d5";

/// Wrap a payload in a successful response frame
pub fn response(status: i32, payload: Value) -> Value {
    json!({
        "header": {
            "code": 0,
            "message": "success",
            "sid": MOCK_SID,
            "stmid": "text-1",
            "status": status
        },
        "payload": payload
    })
}

/// A service error frame
pub fn error_response(code: i64, message: &str) -> Value {
    json!({
        "header": {"code": code, "message": message, "sid": MOCK_SID, "status": 2}
    })
}

/// A text result section (`event`, `iat`, `cbm_semantic`, `nlp`)
pub fn text_payload(section: &str, text: &str, status: i32) -> Value {
    let mut payload = serde_json::Map::new();
    payload.insert(
        section.to_string(),
        json!({
            "compress": "raw",
            "encoding": "utf8",
            "format": "json",
            "seq": 0,
            "status": status,
            "text": BASE64.encode(text.as_bytes())
        }),
    );
    Value::Object(payload)
}

/// A synthesized audio section
pub fn tts_payload(seq: i64, status: i32, audio: &[u8]) -> Value {
    json!({
        "tts": {
            "compress": "raw",
            "encoding": "raw",
            "format": "plain",
            "seq": seq,
            "status": status,
            "audio": BASE64.encode(audio)
        }
    })
}
