//! Audio input sources for streamed turns.
//!
//! The send driver needs the total length up front to compute the chunk count
//! and the status of each chunk, so every source reports its size.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// A finite byte source with a known total length.
#[async_trait]
pub trait AudioSource: Send {
    /// Total number of bytes the source will yield.
    fn total_len(&self) -> u64;

    /// Fill `buf` with the next bytes.
    ///
    /// Returns fewer bytes than `buf.len()` only at end of input.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Raw PCM read from a file.
pub struct FileAudioSource {
    path: PathBuf,
    file: File,
    len: u64,
}

impl FileAudioSource {
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await?;
        let len = file.metadata().await?.len();
        Ok(Self { path, file, len })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AudioSource for FileAudioSource {
    fn total_len(&self) -> u64 {
        self.len
    }

    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

/// Raw PCM held in memory.
#[derive(Debug, Clone)]
pub struct MemoryAudioSource {
    data: Bytes,
    pos: usize,
}

impl MemoryAudioSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }
}

#[async_trait]
impl AudioSource for MemoryAudioSource {
    fn total_len(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_memory_source_chunks() {
        let mut source = MemoryAudioSource::new(vec![7u8; 10]);
        assert_eq!(source.total_len(), 10);

        let mut buf = [0u8; 4];
        assert_eq!(source.read_chunk(&mut buf).await.unwrap(), 4);
        assert_eq!(source.read_chunk(&mut buf).await.unwrap(), 4);
        assert_eq!(source.read_chunk(&mut buf).await.unwrap(), 2);
        assert_eq!(source.read_chunk(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_source() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
        tmp.write_all(&data).unwrap();
        tmp.flush().unwrap();

        let mut source = FileAudioSource::open(tmp.path()).await.unwrap();
        assert_eq!(source.total_len(), 3000);

        let mut collected = Vec::new();
        let mut buf = vec![0u8; 1280];
        loop {
            let n = source.read_chunk(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, data);
    }

    #[tokio::test]
    async fn test_file_source_missing() {
        assert!(FileAudioSource::open("/nonexistent/aiui/input.pcm").await.is_err());
    }
}
