//! Audio Test Fixtures
//!
//! Generated audio keeps the tests free of external files. Everything is in
//! the format AIUI expects for uploads and returns for synthesis:
//! - Sample rate: 16kHz (16000 Hz)
//! - Bit depth: 16-bit signed PCM, little endian
//! - Channels: Mono

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

/// Upload sample rate (16kHz)
pub const SAMPLE_RATE: u32 = 16000;

/// Duration constants (in samples at 16kHz)
pub const MS_40: usize = 640; // one upload chunk
pub const MS_100: usize = 1600;
pub const SECOND: usize = 16000;

/// Generate silence (zeros) as raw bytes
pub fn generate_silence_bytes(duration_samples: usize) -> Vec<u8> {
    samples_to_bytes(&vec![0i16; duration_samples])
}

/// Generate a sine wave tone
pub fn generate_sine_wave(duration_samples: usize, frequency: f32, amplitude: f32) -> Vec<i16> {
    let max_amplitude = amplitude * i16::MAX as f32;
    let angular_freq = 2.0 * PI * frequency / SAMPLE_RATE as f32;

    (0..duration_samples)
        .map(|i| ((angular_freq * i as f32).sin() * max_amplitude) as i16)
        .collect()
}

/// Generate a sine wave as raw bytes
pub fn generate_sine_wave_bytes(
    duration_samples: usize,
    frequency: f32,
    amplitude: f32,
) -> Vec<u8> {
    samples_to_bytes(&generate_sine_wave(duration_samples, frequency, amplitude))
}

/// Convert samples to little-endian bytes
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Split synthesized audio into the chunk sizes a TTS stream would carry
pub fn split_tts_chunks(audio: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
    audio.chunks(chunk_size).map(<[u8]>::to_vec).collect()
}

/// Write raw PCM to `<dir>/<name>` and return the path
pub fn write_pcm_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).expect("failed to write PCM fixture");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_wave_length() {
        assert_eq!(generate_sine_wave_bytes(MS_100, 440.0, 0.5).len(), MS_100 * 2);
    }

    #[test]
    fn test_split_tts_chunks() {
        let chunks = split_tts_chunks(&[0u8; 10], 4);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 2);
    }
}
