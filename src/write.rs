//! WAVE file writer
//!
//! Builds a RIFF/WAVE chunk tree incrementally. Format parameters are set
//! before the first frame is written; the header is emitted lazily on the
//! first write so the `fmt ` record is complete, and all size fields are
//! back-patched when the writer is closed.

use std::io::{Seek, Write};

use crate::chunk::{WriteChunk, ID_DATA, ID_FMT, ID_RIFF, ID_WAVE};
use crate::error::{WavError, WavResult};
use crate::read::WAVE_FORMAT_PCM;

/// A WAVE file being written through a frame-based API.
///
/// Construction emits the `RIFF` header placeholder and `WAVE` tag
/// immediately. Parameters lock once the header goes out; [`close`]
/// finalizes every size field and must run on each exit path (a best-effort
/// close also runs on drop).
///
/// [`close`]: WaveWriter::close
#[derive(Debug)]
pub struct WaveWriter<W: Write + Seek> {
    stream: W,
    root: Option<WriteChunk>,
    data: Option<WriteChunk>,
    channel_count: u16,
    sample_width: u16,
    frame_rate: u32,
    header_written: bool,
    closed: bool,
}

impl<W: Write + Seek> WaveWriter<W> {
    /// Start a WAVE file at the stream's current position.
    pub fn create(mut stream: W) -> WavResult<Self> {
        let mut root = WriteChunk::begin(&mut stream, ID_RIFF)?;
        root.write(&mut stream, &ID_WAVE)?;
        Ok(WaveWriter {
            stream,
            root: Some(root),
            data: None,
            channel_count: 0,
            sample_width: 0,
            frame_rate: 0,
            header_written: false,
            closed: false,
        })
    }

    /// Set the number of interleaved channels, at least 1.
    pub fn set_channel_count(&mut self, channel_count: u16) -> WavResult<()> {
        if self.header_written {
            return Err(WavError::ParameterLocked);
        }
        if channel_count == 0 {
            return Err(WavError::InvalidParameter("channel count must be at least 1"));
        }
        self.channel_count = channel_count;
        Ok(())
    }

    /// Set the sample width in bytes, in 1..=4.
    pub fn set_sample_width(&mut self, sample_width: u16) -> WavResult<()> {
        if self.header_written {
            return Err(WavError::ParameterLocked);
        }
        if !(1..=4).contains(&sample_width) {
            return Err(WavError::InvalidParameter("sample width must be 1 to 4 bytes"));
        }
        self.sample_width = sample_width;
        Ok(())
    }

    /// Set the frame rate in frames per second, nonzero.
    pub fn set_frame_rate(&mut self, frame_rate: u32) -> WavResult<()> {
        if self.header_written {
            return Err(WavError::ParameterLocked);
        }
        if frame_rate == 0 {
            return Err(WavError::InvalidParameter("frame rate must be nonzero"));
        }
        self.frame_rate = frame_rate;
        Ok(())
    }

    /// Bytes per frame across all channels.
    pub fn frame_size(&self) -> usize {
        usize::from(self.channel_count) * usize::from(self.sample_width)
    }

    /// Emit the `fmt ` chunk and open the `data` chunk once all parameters
    /// are known, locking them.
    fn ensure_header_written(&mut self) -> WavResult<()> {
        if self.header_written {
            return Ok(());
        }
        if self.channel_count == 0 {
            return Err(WavError::MissingParameter("channel count"));
        }
        if self.sample_width == 0 {
            return Err(WavError::MissingParameter("sample width"));
        }
        if self.frame_rate == 0 {
            return Err(WavError::MissingParameter("frame rate"));
        }

        // The fmt record fields are fixed-width; extreme channel counts
        // overflow them, so compute wide and truncate like the format does.
        let avg_bytes_per_sec = (u64::from(self.channel_count)
            * u64::from(self.frame_rate)
            * u64::from(self.sample_width)) as u32;
        let block_align = (u32::from(self.channel_count) * u32::from(self.sample_width)) as u16;
        let bits_per_sample = self.sample_width * 8;

        let mut record = [0u8; 16];
        record[0..2].copy_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
        record[2..4].copy_from_slice(&self.channel_count.to_le_bytes());
        record[4..8].copy_from_slice(&self.frame_rate.to_le_bytes());
        record[8..12].copy_from_slice(&avg_bytes_per_sec.to_le_bytes());
        record[12..14].copy_from_slice(&block_align.to_le_bytes());
        record[14..16].copy_from_slice(&bits_per_sample.to_le_bytes());

        let mut fmt = WriteChunk::begin(&mut self.stream, ID_FMT)?;
        fmt.write(&mut self.stream, &record)?;
        let on_stream = fmt.end(&mut self.stream)?;
        if let Some(root) = self.root.as_mut() {
            root.absorb(on_stream);
        }

        self.data = Some(WriteChunk::begin(&mut self.stream, ID_DATA)?);
        self.header_written = true;
        Ok(())
    }

    /// Append `frames` interleaved frames from `data`.
    ///
    /// The first call finalizes the header; [`WavError::MissingParameter`]
    /// if any of channel count, sample width, or frame rate is still unset.
    /// `data` must hold at least `frames * frame_size()` bytes.
    pub fn write_frames(&mut self, data: &[u8], frames: usize) -> WavResult<()> {
        self.ensure_header_written()?;
        let len = frames
            .checked_mul(self.frame_size())
            .ok_or(WavError::InvalidParameter("frame buffer too small"))?;
        let src = data
            .get(..len)
            .ok_or(WavError::InvalidParameter("frame buffer too small"))?;
        match self.data.as_mut() {
            Some(chunk) => chunk.write(&mut self.stream, src),
            None => Err(WavError::MissingChunk),
        }
    }

    /// Finalize the file: close the `data` chunk, back-patch its size, and
    /// propagate the total up into the root `RIFF` size.
    ///
    /// Runs the header path first so a writer closed without any frames
    /// still produces a structurally valid, zero-frame WAVE file.
    /// Idempotent; later calls are no-ops.
    pub fn close(&mut self) -> WavResult<()> {
        if self.closed {
            return Ok(());
        }
        self.ensure_header_written()?;
        if let Some(data) = self.data.take() {
            let on_stream = data.end(&mut self.stream)?;
            if let Some(root) = self.root.as_mut() {
                root.absorb(on_stream);
            }
        }
        if let Some(root) = self.root.take() {
            root.end(&mut self.stream)?;
        }
        self.stream.flush()?;
        self.closed = true;
        Ok(())
    }
}

impl<W: Write + Seek> Drop for WaveWriter<W> {
    fn drop(&mut self) {
        // Skip the close while unwinding: a second panic in a destructor
        // aborts the process.
        if !self.closed && !std::thread::panicking() {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::WaveReader;
    use std::io::Cursor;

    fn le16(bytes: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([bytes[at], bytes[at + 1]])
    }

    fn le32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn test_header_bytes_exact() {
        let mut stream = Cursor::new(Vec::new());
        {
            let mut writer = WaveWriter::create(&mut stream).expect("create");
            writer.set_channel_count(2).expect("channels");
            writer.set_sample_width(2).expect("width");
            writer.set_frame_rate(44100).expect("rate");
            writer.write_frames(&[0u8; 8], 2).expect("write");
            writer.close().expect("close");
        }
        let bytes = stream.into_inner();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(le32(&bytes, 4), 4 + 24 + 8 + 8);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(le32(&bytes, 16), 16);
        assert_eq!(le16(&bytes, 20), 1); // PCM
        assert_eq!(le16(&bytes, 22), 2); // channels
        assert_eq!(le32(&bytes, 24), 44100);
        assert_eq!(le32(&bytes, 28), 44100 * 4); // avg bytes/sec
        assert_eq!(le16(&bytes, 32), 4); // block align
        assert_eq!(le16(&bytes, 34), 16); // bits per sample
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(le32(&bytes, 40), 8);
        assert_eq!(bytes.len(), 52);
    }

    #[test]
    fn test_parameters_lock_after_first_write() {
        let mut stream = Cursor::new(Vec::new());
        let mut writer = WaveWriter::create(&mut stream).expect("create");
        writer.set_channel_count(1).expect("channels");
        writer.set_sample_width(1).expect("width");
        writer.set_frame_rate(8000).expect("rate");
        writer.write_frames(&[0u8; 2], 2).expect("write");
        assert!(matches!(
            writer.set_channel_count(2),
            Err(WavError::ParameterLocked)
        ));
        assert!(matches!(
            writer.set_sample_width(2),
            Err(WavError::ParameterLocked)
        ));
        assert!(matches!(
            writer.set_frame_rate(16000),
            Err(WavError::ParameterLocked)
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        let mut stream = Cursor::new(Vec::new());
        let mut writer = WaveWriter::create(&mut stream).expect("create");
        assert!(matches!(
            writer.set_channel_count(0),
            Err(WavError::InvalidParameter(_))
        ));
        assert!(matches!(
            writer.set_sample_width(0),
            Err(WavError::InvalidParameter(_))
        ));
        assert!(matches!(
            writer.set_sample_width(5),
            Err(WavError::InvalidParameter(_))
        ));
        assert!(matches!(
            writer.set_frame_rate(0),
            Err(WavError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_write_without_parameters() {
        let mut stream = Cursor::new(Vec::new());
        let mut writer = WaveWriter::create(&mut stream).expect("create");
        writer.set_channel_count(1).expect("channels");
        let result = writer.write_frames(&[0u8; 2], 1);
        assert!(matches!(result, Err(WavError::MissingParameter(_))));
    }

    #[test]
    fn test_zero_frame_file_is_valid() {
        let mut stream = Cursor::new(Vec::new());
        {
            let mut writer = WaveWriter::create(&mut stream).expect("create");
            writer.set_channel_count(1).expect("channels");
            writer.set_sample_width(2).expect("width");
            writer.set_frame_rate(8000).expect("rate");
            writer.close().expect("close");
        }
        stream.set_position(0);
        let reader = WaveReader::open(stream).expect("reopen");
        assert_eq!(reader.frame_count(), 0);
        assert_eq!(reader.channel_count(), 1);
        assert_eq!(reader.frame_rate(), 8000);
    }

    #[test]
    fn test_odd_data_size_padded() {
        let mut stream = Cursor::new(Vec::new());
        {
            let mut writer = WaveWriter::create(&mut stream).expect("create");
            writer.set_channel_count(1).expect("channels");
            writer.set_sample_width(1).expect("width");
            writer.set_frame_rate(8000).expect("rate");
            writer.write_frames(&[0x41, 0x42, 0x43], 3).expect("write");
            writer.close().expect("close");
        }
        let bytes = stream.into_inner();
        // data size records 3 but one pad byte follows.
        assert_eq!(le32(&bytes, 40), 3);
        assert_eq!(bytes.len(), 44 + 3 + 1);
        // Root size covers the pad byte.
        assert_eq!(le32(&bytes, 4), (bytes.len() - 8) as u32);
        assert_eq!(bytes[47], 0);
    }

    #[test]
    fn test_extreme_channel_count_closes_cleanly() {
        let mut stream = Cursor::new(Vec::new());
        {
            let mut writer = WaveWriter::create(&mut stream).expect("create");
            writer.set_channel_count(u16::MAX).expect("channels");
            writer.set_sample_width(4).expect("width");
            writer.set_frame_rate(48000).expect("rate");
            writer.close().expect("close");
        }
        let bytes = stream.into_inner();
        // Fixed-width fmt fields hold the truncated products.
        assert_eq!(le16(&bytes, 22), u16::MAX);
        assert_eq!(le16(&bytes, 32), ((u32::from(u16::MAX) * 4) & 0xFFFF) as u16);
        assert_eq!(le32(&bytes, 28), (u64::from(u16::MAX) * 48000 * 4) as u32);
        assert_eq!(le16(&bytes, 34), 32); // bits per sample
    }

    #[test]
    fn test_extreme_params_drop_without_close() {
        let mut stream = Cursor::new(Vec::new());
        {
            let mut writer = WaveWriter::create(&mut stream).expect("create");
            writer.set_channel_count(u16::MAX).expect("channels");
            writer.set_sample_width(4).expect("width");
            writer.set_frame_rate(48000).expect("rate");
            // No explicit close; the destructor finalizes the header.
        }
        stream.set_position(0);
        let reader = WaveReader::open(stream).expect("reopen");
        assert_eq!(reader.channel_count(), u16::MAX);
        assert_eq!(reader.frame_count(), 0);
    }

    #[test]
    fn test_write_frames_count_overflow() {
        let mut stream = Cursor::new(Vec::new());
        let mut writer = WaveWriter::create(&mut stream).expect("create");
        writer.set_channel_count(1).expect("channels");
        writer.set_sample_width(2).expect("width");
        writer.set_frame_rate(8000).expect("rate");
        let result = writer.write_frames(&[0u8; 4], usize::MAX);
        assert!(matches!(result, Err(WavError::InvalidParameter(_))));
    }

    #[test]
    fn test_close_idempotent() {
        let mut stream = Cursor::new(Vec::new());
        let mut writer = WaveWriter::create(&mut stream).expect("create");
        writer.set_channel_count(1).expect("channels");
        writer.set_sample_width(2).expect("width");
        writer.set_frame_rate(8000).expect("rate");
        writer.close().expect("close");
        writer.close().expect("close again");
    }

    #[test]
    fn test_drop_finalizes_sizes() {
        let mut stream = Cursor::new(Vec::new());
        {
            let mut writer = WaveWriter::create(&mut stream).expect("create");
            writer.set_channel_count(1).expect("channels");
            writer.set_sample_width(2).expect("width");
            writer.set_frame_rate(8000).expect("rate");
            writer.write_frames(&[1, 0, 2, 0], 2).expect("write");
            // No explicit close; drop patches the sizes.
        }
        stream.set_position(0);
        let reader = WaveReader::open(stream).expect("reopen");
        assert_eq!(reader.frame_count(), 2);
    }

    #[test]
    fn test_roundtrip_through_reader() {
        let mut stream = Cursor::new(Vec::new());
        {
            let mut writer = WaveWriter::create(&mut stream).expect("create");
            writer.set_channel_count(2).expect("channels");
            writer.set_sample_width(2).expect("width");
            writer.set_frame_rate(22050).expect("rate");
            writer
                .write_frames(&[1, 0, 2, 0, 3, 0, 4, 0], 2)
                .expect("write");
            writer.close().expect("close");
        }
        stream.set_position(0);
        let mut reader = WaveReader::open(stream).expect("reopen");
        assert_eq!(reader.frame_count(), 2);
        assert_eq!(reader.frame_rate(), 22050);
        let mut buf = [0u8; 8];
        reader.read_frames(&mut buf, 2).expect("read");
        assert_eq!(buf, [1, 0, 2, 0, 3, 0, 4, 0]);
    }
}
