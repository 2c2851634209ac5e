//! PCM sample codec
//!
//! Converts between on-disk interleaved PCM frames and a flat float buffer.
//! Decoding mixes all channels down to mono by averaging; encoding clips,
//! requantizes with half-up rounding, and emits little-endian sample bytes
//! at 8/16/24/32-bit depths.
//!
//! Decoded samples keep the raw integer scale of the file (the channel
//! average is a mix, not a bit-depth normalization), matching the library
//! this codec interoperates with.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::WavResult;
use crate::read::WaveReader;
use crate::write::WaveWriter;

/// Frames converted per chunk read while decoding.
const FRAMES_PER_READ: usize = 1024;

/// Decoded audio: one mixed-down float per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Channel-averaged samples at the file's raw integer scale
    pub samples: Vec<f32>,
    /// Frames per second, 0.0 when the file could not be opened
    pub frame_rate: f32,
}

/// Sign-extend one little-endian sample of 1 to 4 bytes.
///
/// Width 1 is offset-binary (unsigned with a 0x80 bias); wider samples are
/// two's complement.
fn sign_extend(raw: &[u8]) -> i32 {
    match *raw {
        [b0] => i32::from(b0) - 0x80,
        [b0, b1] => i32::from(i16::from_le_bytes([b0, b1])),
        [b0, b1, b2] => (i32::from_le_bytes([b0, b1, b2, 0]) << 8) >> 8,
        [b0, b1, b2, b3] => i32::from_le_bytes([b0, b1, b2, b3]),
        _ => 0,
    }
}

/// Clip to [-1, 1] and requantize to a signed sample of `width` bytes.
///
/// Rounds the scaled value half-up, then clamps to the signed range of the
/// width so full-scale input never wraps. Width 1 is biased to
/// offset-binary.
fn quantize(sample: f32, width: usize) -> i32 {
    let clipped = f64::from(sample.clamp(-1.0, 1.0));
    let scale = (1u64 << (8 * width)) as f64;
    let rounded = (clipped * scale + 1.0) as i64 >> 1;
    let max = (1i64 << (8 * width - 1)) - 1;
    let min = -(1i64 << (8 * width - 1));
    let mut quantized = rounded.clamp(min, max) as i32;
    if width == 1 {
        quantized += 0x80;
    }
    quantized
}

/// Read a WAVE file into channel-averaged float samples.
///
/// A path that cannot be opened is a soft failure: the result is empty with
/// a frame rate of 0.0. Anything structurally wrong with an opened file is
/// a hard error.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))
)]
pub fn decode(path: impl AsRef<Path>) -> WavResult<Decoded> {
    let file = match File::open(path.as_ref()) {
        Ok(file) => file,
        Err(_) => {
            return Ok(Decoded {
                samples: Vec::new(),
                frame_rate: 0.0,
            })
        }
    };
    let mut reader = WaveReader::open(BufReader::new(file))?;

    let channels = usize::from(reader.channel_count());
    let width = usize::from(reader.sample_width());
    let frame_size = reader.frame_size();
    let frame_count = reader.frame_count() as usize;
    let frame_rate = reader.frame_rate() as f32;

    let scale = 1.0 / channels as f32;
    let mut samples = Vec::with_capacity(frame_count);
    let mut buf = vec![0u8; frame_size * FRAMES_PER_READ];
    let mut remaining = frame_count;
    while remaining > 0 {
        let frames = remaining.min(FRAMES_PER_READ);
        reader.read_frames(&mut buf, frames)?;
        for frame in buf[..frames * frame_size].chunks_exact(frame_size) {
            let mut acc = 0.0f32;
            for raw in frame.chunks_exact(width) {
                acc += sign_extend(raw) as f32 * scale;
            }
            samples.push(acc);
        }
        remaining -= frames;
    }

    Ok(Decoded {
        samples,
        frame_rate,
    })
}

/// Quantize float samples and write them out as a PCM WAVE file.
///
/// `samples` holds interleaved channel data in [-1, 1]; a trailing partial
/// frame is silently dropped. Returns `Ok(false)` only when the output
/// path cannot be created; writer misuse (zero channels, width outside
/// 1..=4, zero rate) is a hard error.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        level = "info",
        skip(path, samples),
        fields(path = %path.as_ref().display(), samples_len = samples.len())
    )
)]
pub fn encode(
    path: impl AsRef<Path>,
    samples: &[f32],
    frame_rate: u32,
    sample_width: u16,
    channel_count: u16,
) -> WavResult<bool> {
    let file = match File::create(path.as_ref()) {
        Ok(file) => file,
        Err(_) => return Ok(false),
    };
    let mut stream = BufWriter::new(file);
    let mut writer = WaveWriter::create(&mut stream)?;
    writer.set_channel_count(channel_count)?;
    writer.set_sample_width(sample_width)?;
    writer.set_frame_rate(frame_rate)?;

    let width = usize::from(sample_width);
    let frame_count = samples.len() / usize::from(channel_count);
    let used = frame_count * usize::from(channel_count);
    let mut quantized = Vec::with_capacity(used * width);
    for &sample in &samples[..used] {
        let bytes = quantize(sample, width).to_le_bytes();
        quantized.extend_from_slice(&bytes[..width]);
    }

    writer.write_frames(&quantized, frame_count)?;
    writer.close()?;
    Ok(true)
}
