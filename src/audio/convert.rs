//! Native-frame → mono 16-bit PCM conversion.
//!
//! The recognition transport accepts **mono, 16-bit, little-endian** PCM at
//! the source sample rate.  [`convert_frames`] takes a raw device buffer plus
//! its [`FrameFormat`] and performs the whole conversion in one pass:
//!
//! 1. split the buffer into frames using the format's block alignment,
//! 2. average all channels of each frame into one `f32` sample,
//! 3. clamp to `[-1.0, 1.0]` and quantize to `i16`,
//! 4. append the two little-endian bytes.
//!
//! Everything here is pure and allocation-bounded; it runs inside the audio
//! callback, so there is no I/O and no locking.

// ---------------------------------------------------------------------------
// SampleEncoding / FrameFormat
// ---------------------------------------------------------------------------

/// How the device encodes one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Signed integer PCM (16, 24, or 32 bits are understood).
    Pcm,
    /// 32-bit IEEE float.
    IeeeFloat,
}

/// Native format of the buffers a capture device delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    /// Sample rate in Hz (e.g. 44100, 48000).
    pub sample_rate: u32,
    /// Bits per single-channel sample (16, 24, 32, …).
    pub bits_per_sample: u16,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
    /// Sample encoding.
    pub encoding: SampleEncoding,
}

impl FrameFormat {
    /// Bytes occupied by one sample of one channel (at least 1).
    pub fn bytes_per_sample(&self) -> usize {
        ((self.bits_per_sample / 8) as usize).max(1)
    }

    /// Bytes occupied by one frame across all channels (at least 1).
    pub fn block_align(&self) -> usize {
        (self.bytes_per_sample() * (self.channels as usize).max(1)).max(1)
    }
}

// ---------------------------------------------------------------------------
// convert_frames
// ---------------------------------------------------------------------------

/// Convert a native device buffer into mono 16-bit little-endian PCM bytes.
///
/// The output holds exactly `bytes.len() / format.block_align()` samples
/// (two bytes each); a trailing partial frame is ignored.  Samples in an
/// encoding/bit-width combination this module does not understand read as
/// silence rather than failing the stream.
///
/// # Example
///
/// ```rust
/// use live_captions::audio::{convert_frames, FrameFormat, SampleEncoding};
///
/// // One stereo float frame: L = 0.5, R = -0.5 → mono 0.0
/// let format = FrameFormat {
///     sample_rate: 48_000,
///     bits_per_sample: 32,
///     channels: 2,
///     encoding: SampleEncoding::IeeeFloat,
/// };
/// let mut bytes = Vec::new();
/// bytes.extend_from_slice(&0.5_f32.to_le_bytes());
/// bytes.extend_from_slice(&(-0.5_f32).to_le_bytes());
///
/// let pcm = convert_frames(&bytes, &format);
/// assert_eq!(pcm, vec![0, 0]);
/// ```
pub fn convert_frames(bytes: &[u8], format: &FrameFormat) -> Vec<u8> {
    let bytes_per_sample = format.bytes_per_sample();
    let channels = (format.channels as usize).max(1);
    let block_align = format.block_align();

    let frame_count = bytes.len() / block_align;
    if frame_count == 0 {
        return Vec::new();
    }

    let mut pcm = Vec::with_capacity(frame_count * 2);

    for frame in 0..frame_count {
        let mut sum = 0.0_f32;
        for ch in 0..channels {
            let offset = frame * block_align + ch * bytes_per_sample;
            sum += read_sample(bytes, offset, format);
        }

        let mono = (sum / channels as f32).clamp(-1.0, 1.0);
        let quantized = (mono * i16::MAX as f32) as i16;
        pcm.extend_from_slice(&quantized.to_le_bytes());
    }

    pcm
}

// ---------------------------------------------------------------------------
// read_sample
// ---------------------------------------------------------------------------

/// Read one sample at `offset` and normalize it to `[-1.0, 1.0]`.
///
/// Unsupported encoding/bit-width combinations and reads past the end of the
/// buffer both yield `0.0` (silence).
pub fn read_sample(bytes: &[u8], offset: usize, format: &FrameFormat) -> f32 {
    match (format.encoding, format.bits_per_sample) {
        (SampleEncoding::IeeeFloat, 32) => match bytes.get(offset..offset + 4) {
            Some(b) => f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            None => 0.0,
        },
        (SampleEncoding::Pcm, 16) => match bytes.get(offset..offset + 2) {
            Some(b) => i16::from_le_bytes([b[0], b[1]]) as f32 / 32_768.0,
            None => 0.0,
        },
        (SampleEncoding::Pcm, 24) => match bytes.get(offset..offset + 3) {
            Some(b) => {
                // Place the 3 bytes in the top of an i32, then shift back down
                // so the sign bit propagates.
                let raw = i32::from_le_bytes([0, b[0], b[1], b[2]]);
                (raw >> 8) as f32 / 8_388_608.0
            }
            None => 0.0,
        },
        (SampleEncoding::Pcm, 32) => match bytes.get(offset..offset + 4) {
            Some(b) => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32 / 2_147_483_648.0,
            None => 0.0,
        },
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
