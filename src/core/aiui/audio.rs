//! Synthesized audio reassembly.
//!
//! TTS audio arrives as numbered chunks. Chunk `seq == 1` opens a new output
//! stream named `<sid>.<ext>`; every following chunk must carry the next
//! sequence number and is appended in order. Output I/O failures are logged
//! and never fail the session.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::base::AudioOutputInfo;

/// File extension for a TTS encoding.
pub fn extension_for(encoding: &str) -> &'static str {
    match encoding {
        "raw" => "pcm",
        "lame" => "mp3",
        _ => "unknown",
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// An open output stream.
#[async_trait]
pub trait AudioStream: Send {
    async fn append(&mut self, bytes: &[u8]) -> io::Result<()>;

    async fn close(&mut self) -> io::Result<()>;
}

/// Opens named output streams.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn open(&self, name: &str) -> io::Result<Box<dyn AudioStream>>;
}

/// Writes each stream to `<dir>/<name>`.
#[derive(Debug, Clone)]
pub struct FileAudioSink {
    dir: PathBuf,
}

impl FileAudioSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

struct FileAudioStream {
    file: File,
}

#[async_trait]
impl AudioStream for FileAudioStream {
    async fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes).await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await
    }
}

#[async_trait]
impl AudioSink for FileAudioSink {
    async fn open(&self, name: &str) -> io::Result<Box<dyn AudioStream>> {
        let file = File::create(self.dir.join(name)).await?;
        Ok(Box::new(FileAudioStream { file }))
    }
}

/// Keeps every stream in memory; clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryAudioSink {
    streams: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    closed: Arc<Mutex<Vec<String>>>,
}

impl MemoryAudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of a stream, if it was opened.
    pub fn get(&self, name: &str) -> Option<Bytes> {
        self.streams.lock().get(name).cloned().map(Bytes::from)
    }

    /// Names of all opened streams.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.streams.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of times `name` was closed.
    pub fn close_count(&self, name: &str) -> usize {
        self.closed.lock().iter().filter(|n| *n == name).count()
    }
}

struct MemoryAudioStream {
    name: String,
    sink: MemoryAudioSink,
}

#[async_trait]
impl AudioStream for MemoryAudioStream {
    async fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.sink
            .streams
            .lock()
            .entry(self.name.clone())
            .or_default()
            .extend_from_slice(bytes);
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.sink.closed.lock().push(self.name.clone());
        Ok(())
    }
}

#[async_trait]
impl AudioSink for MemoryAudioSink {
    async fn open(&self, name: &str) -> io::Result<Box<dyn AudioStream>> {
        self.streams.lock().insert(name.to_string(), Vec::new());
        Ok(Box::new(MemoryAudioStream {
            name: name.to_string(),
            sink: self.clone(),
        }))
    }
}

// =============================================================================
// Reassembler
// =============================================================================

struct OpenStream {
    name: String,
    stream: Box<dyn AudioStream>,
    last_seq: i64,
    bytes: u64,
    chunks: u32,
}

/// Orders TTS chunks into a single output stream per session.
pub struct AudioReassembler {
    sink: Arc<dyn AudioSink>,
    current: Option<OpenStream>,
    output: Option<AudioOutputInfo>,
}

impl AudioReassembler {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            current: None,
            output: None,
        }
    }

    /// Accept one TTS chunk.
    pub async fn accept(&mut self, sid: &str, encoding: &str, seq: i64, bytes: &[u8]) {
        if seq == 1 {
            self.close_current().await;

            let name = format!("{sid}.{}", extension_for(encoding));
            match self.sink.open(&name).await {
                Ok(stream) => {
                    info!(name = %name, "Opened audio output");
                    self.current = Some(OpenStream {
                        name,
                        stream,
                        last_seq: 0,
                        bytes: 0,
                        chunks: 0,
                    });
                }
                Err(e) => {
                    warn!(name = %name, "Failed to open audio output: {}", e);
                    return;
                }
            }
        }

        let Some(open) = self.current.as_mut() else {
            warn!(seq, "Dropping audio chunk with no open output");
            return;
        };

        if seq != open.last_seq + 1 {
            warn!(
                seq,
                expected = open.last_seq + 1,
                "Dropping out-of-order audio chunk"
            );
            return;
        }

        // A failed write loses only this chunk
        open.last_seq = seq;
        match open.stream.append(bytes).await {
            Ok(()) => {
                open.bytes += bytes.len() as u64;
                open.chunks += 1;
                debug!(seq, len = bytes.len(), "Appended audio chunk");
            }
            Err(e) => warn!(seq, "Failed to write audio chunk: {}", e),
        }
    }

    /// Summary of the last closed stream.
    pub fn output(&self) -> Option<AudioOutputInfo> {
        self.output.clone()
    }

    /// Close the open stream, if any. Safe to call repeatedly.
    pub async fn finalize(&mut self) -> Option<AudioOutputInfo> {
        self.close_current().await;
        self.output.clone()
    }

    async fn close_current(&mut self) {
        if let Some(mut open) = self.current.take() {
            if let Err(e) = open.stream.close().await {
                warn!(name = %open.name, "Failed to close audio output: {}", e);
            }
            info!(name = %open.name, bytes = open.bytes, chunks = open.chunks, "Closed audio output");
            self.output = Some(AudioOutputInfo {
                name: open.name,
                bytes: open.bytes,
                chunks: open.chunks,
            });
        }
    }
}
