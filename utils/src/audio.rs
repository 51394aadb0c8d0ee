use base64::Engine;
use ringbuf::HeapRb;
use rubato::{FastFixedIn, PolynomialDegree};

/// Sample rate the service expects for microphone audio sent upstream.
pub const SERVICE_INPUT_SAMPLE_RATE: f64 = 16000.0;
/// Sample rate of synthesized audio received downstream.
pub const SERVICE_OUTPUT_SAMPLE_RATE: f64 = 24000.0;

/// A payload that could not be turned into playable samples.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("payload holds {0} bytes, not a whole number of PCM16 frames")]
    TruncatedFrame(usize),
}

pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size, 0.0);
            chunk
        })
        .collect()
}

pub fn shared_buffer(size: usize) -> HeapRb<f32> {
    HeapRb::new(size)
}

/// Decodes a base64 PCM16 payload into normalized f32 samples.
///
/// Malformed payloads fail with [`CodecError`] so the caller can drop the
/// chunk without touching the playback timeline. An empty payload decodes to
/// an empty sample buffer.
pub fn decode(fragment: &str) -> Result<Vec<f32>, CodecError> {
    let pcm16 = base64::engine::general_purpose::STANDARD.decode(fragment)?;
    if pcm16.len() % 2 != 0 {
        return Err(CodecError::TruncatedFrame(pcm16.len()));
    }
    Ok(pcm16
        .chunks_exact(2)
        .map(|chunk| {
            let v = i16::from_le_bytes([chunk[0], chunk[1]]);
            (v as f32 / i16::MAX as f32).clamp(-1.0, 1.0)
        })
        .collect())
}

pub fn encode(pcm32: &[f32]) -> String {
    let pcm16: Vec<u8> = pcm32
        .iter()
        .flat_map(|&sample| {
            ((sample * i16::MAX as f32) as i16)
                .clamp(i16::MIN, i16::MAX)
                .to_le_bytes()
        })
        .collect();
    base64::engine::general_purpose::STANDARD.encode(&pcm16)
}
