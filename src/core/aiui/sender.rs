//! Outbound half of a session.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::base::{AiuiError, AiuiResult};
use super::messages::{FrameBuilder, STATUS_CONTINUE, STATUS_FIRST, STATUS_LAST};
use super::source::AudioSource;
use super::transport::FrameWriter;

/// What a session uploads.
pub enum SessionPayload {
    /// A single text turn
    Text(String),
    /// A paced stream of audio chunks
    Audio(Box<dyn AudioSource>),
}

impl std::fmt::Debug for SessionPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPayload::Text(text) => f.debug_tuple("Text").field(text).finish(),
            SessionPayload::Audio(source) => f
                .debug_struct("Audio")
                .field("total_len", &source.total_len())
                .finish(),
        }
    }
}

/// Status of chunk `index` (1-based) out of `max`.
pub fn chunk_status(index: u64, max: u64) -> i32 {
    if index == max {
        STATUS_LAST
    } else if index == 1 {
        STATUS_FIRST
    } else {
        STATUS_CONTINUE
    }
}

/// Number of chunks needed for `total` bytes.
pub fn chunk_count(total: u64, chunk_size: usize) -> u64 {
    total.div_ceil(chunk_size as u64)
}

/// Drives the outbound frames of one session.
pub struct SendDriver<W: FrameWriter> {
    writer: W,
    builder: FrameBuilder,
    chunk_size: usize,
    interval: Duration,
}

impl<W: FrameWriter> SendDriver<W> {
    pub fn new(writer: W, builder: FrameBuilder, chunk_size: usize, interval: Duration) -> Self {
        Self {
            writer,
            builder,
            chunk_size,
            interval,
        }
    }

    /// Send the payload, returning the number of frames pushed.
    pub async fn run(&mut self, payload: SessionPayload) -> AiuiResult<usize> {
        match payload {
            SessionPayload::Text(text) => {
                self.writer.send(&self.builder.text_frame(&text)).await?;
                info!("Sent text turn");
                Ok(1)
            }
            SessionPayload::Audio(source) => self.send_audio(source).await,
        }
    }

    async fn send_audio(&mut self, mut source: Box<dyn AudioSource>) -> AiuiResult<usize> {
        let total = source.total_len();
        let max = chunk_count(total, self.chunk_size);
        if max == 0 {
            warn!("Audio source is empty, nothing to send");
            return Ok(0);
        }

        info!(total, chunks = max, "Streaming audio");
        let mut buf = vec![0u8; self.chunk_size];
        let mut sent = 0;

        for index in 1..=max {
            let n = source.read_chunk(&mut buf).await.map_err(AiuiError::AudioIo)?;
            let status = chunk_status(index, max);
            self.writer
                .send(&self.builder.audio_frame(&buf[..n], status))
                .await?;
            sent += 1;
            debug!(index, status, len = n, "Sent audio chunk");

            tokio::time::sleep(self.interval).await;
        }

        Ok(sent)
    }

    /// Give back the writer, e.g. to close it.
    pub fn into_writer(self) -> W {
        self.writer
    }
}
