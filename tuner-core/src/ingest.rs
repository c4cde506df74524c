//! # Sample Ingestion
//!
//! Converts raw 16-bit PCM blocks delivered by a capture source into
//! normalized floating point samples in [-1.0, 1.0].

const BYTES_PER_SAMPLE: usize = 2;

/// Normalizes signed 16-bit samples by dividing by 32768.
pub fn normalize(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// Decodes a little-endian 16-bit PCM byte buffer and normalizes it.
///
/// Only the first `bytes_recorded` bytes of `buffer` are valid. Returns `None`
/// for blocks that are empty, claim more bytes than the buffer holds, or end
/// in half a sample.
pub fn normalize_bytes(buffer: &[u8], bytes_recorded: usize) -> Option<Vec<f32>> {
    if bytes_recorded == 0
        || bytes_recorded > buffer.len()
        || bytes_recorded % BYTES_PER_SAMPLE != 0
    {
        return None;
    }
    let samples = buffer[..bytes_recorded]
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();
    Some(samples)
}
