//! WAVE file reader
//!
//! Walks the RIFF chunk tree of a stream, validates the `fmt ` chunk, and
//! exposes a frame-based read API over the `data` chunk.

use std::io::{Read, Seek};

use crate::chunk::{ReadChunk, ID_DATA, ID_FMT, ID_RIFF, ID_WAVE};
use crate::error::{WavError, WavResult};

/// PCM format tag in the `fmt ` chunk
pub(crate) const WAVE_FORMAT_PCM: u16 = 1;

/// Parsed contents of a PCM `fmt ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFormat {
    /// Number of interleaved channels, at least 1
    pub channel_count: u16,
    /// Frames per second
    pub frame_rate: u32,
    /// Average data rate in bytes per second
    pub avg_bytes_per_sec: u32,
    /// Bytes per frame across all channels
    pub block_align: u16,
    /// Bytes per sample, derived from bits per sample, in 1..=4
    pub sample_width: u16,
}

fn parse_fmt<R: Read + Seek>(chunk: &mut ReadChunk, stream: &mut R) -> WavResult<WaveFormat> {
    // 14 fixed bytes: tag, channels, frame rate, avg bytes/sec, block align.
    let mut fixed = [0u8; 14];
    chunk.read(stream, &mut fixed)?;
    let format_tag = u16::from_le_bytes([fixed[0], fixed[1]]);
    let channel_count = u16::from_le_bytes([fixed[2], fixed[3]]);
    let frame_rate = u32::from_le_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]);
    let avg_bytes_per_sec = u32::from_le_bytes([fixed[8], fixed[9], fixed[10], fixed[11]]);
    let block_align = u16::from_le_bytes([fixed[12], fixed[13]]);

    if format_tag != WAVE_FORMAT_PCM {
        return Err(WavError::UnsupportedFormatTag(format_tag));
    }
    if channel_count == 0 {
        return Err(WavError::MalformedHeader);
    }

    // PCM carries 2 more bytes of bits-per-sample.
    let mut bits = [0u8; 2];
    chunk.read(stream, &mut bits)?;
    let bits_per_sample = u16::from_le_bytes(bits);
    // Widened so a declared depth near u16::MAX cannot overflow the round-up.
    let sample_width = (u32::from(bits_per_sample) + 7) / 8;
    if !(1..=4).contains(&sample_width) {
        return Err(WavError::MalformedHeader);
    }
    let sample_width = sample_width as u16;

    Ok(WaveFormat {
        channel_count,
        frame_rate,
        avg_bytes_per_sec,
        block_align,
        sample_width,
    })
}

/// A WAVE file opened for frame-based reading.
///
/// Owns the backing stream for the lifetime of the session together with
/// the parsed format and the `data` chunk used as the read cursor.
#[derive(Debug)]
pub struct WaveReader<R> {
    stream: R,
    format: WaveFormat,
    data: ReadChunk,
    frame_count: u64,
}

impl<R: Read + Seek> WaveReader<R> {
    /// Parse the RIFF/WAVE structure at the start of `stream`.
    ///
    /// Scans root subchunks in file order: `fmt ` is parsed into a
    /// [`WaveFormat`], the first `data` chunk wins and stops the scan, and
    /// unknown chunk ids are tolerated and skipped. A `data` chunk ahead of
    /// `fmt ` is [`WavError::DataBeforeFmt`]; if either never appears the
    /// result is [`WavError::MissingChunk`].
    pub fn open(mut stream: R) -> WavResult<Self> {
        let mut root = ReadChunk::open_root(&mut stream)?;
        if root.id() != ID_RIFF {
            return Err(WavError::NotRiff);
        }
        let mut form = [0u8; 4];
        root.read(&mut stream, &mut form)?;
        if form != ID_WAVE {
            return Err(WavError::NotWave);
        }

        let mut format = None;
        let mut data = None;
        for mut chunk in root.discover_subchunks(&mut stream)? {
            match chunk.id() {
                ID_FMT => {
                    format = Some(parse_fmt(&mut chunk, &mut stream)?);
                }
                ID_DATA => {
                    if format.is_none() {
                        return Err(WavError::DataBeforeFmt);
                    }
                    data = Some(chunk);
                    // First data chunk wins; anything after it is ignored.
                    break;
                }
                _ => {}
            }
        }

        let (format, data) = match (format, data) {
            (Some(format), Some(data)) => (format, data),
            _ => return Err(WavError::MissingChunk),
        };
        let frame_size = u64::from(format.channel_count) * u64::from(format.sample_width);
        let frame_count = u64::from(data.size()) / frame_size;

        Ok(WaveReader {
            stream,
            format,
            data,
            frame_count,
        })
    }

    /// The parsed `fmt ` record.
    pub fn format(&self) -> WaveFormat {
        self.format
    }

    /// Number of interleaved channels.
    pub fn channel_count(&self) -> u16 {
        self.format.channel_count
    }

    /// Frames per second.
    pub fn frame_rate(&self) -> u32 {
        self.format.frame_rate
    }

    /// Bytes per sample.
    pub fn sample_width(&self) -> u16 {
        self.format.sample_width
    }

    /// Bytes per frame across all channels.
    pub fn frame_size(&self) -> usize {
        usize::from(self.format.channel_count) * usize::from(self.format.sample_width)
    }

    /// Total frames in the `data` chunk.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Read `frames` interleaved frames into `buf`.
    ///
    /// `buf` must hold at least `frames * frame_size()` bytes. Fails with
    /// [`WavError::TruncatedChunk`] when fewer frames remain than requested.
    pub fn read_frames(&mut self, buf: &mut [u8], frames: usize) -> WavResult<()> {
        let len = frames
            .checked_mul(self.frame_size())
            .ok_or(WavError::InvalidParameter("frame buffer too small"))?;
        let dst = buf
            .get_mut(..len)
            .ok_or(WavError::InvalidParameter("frame buffer too small"))?;
        self.data.read(&mut self.stream, dst)
    }
}
