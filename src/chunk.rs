//! Generic RIFF chunk model
//!
//! A RIFF file is a tree of chunks: a 4-byte id, a little-endian u32 size,
//! and a payload that may itself contain child chunks. Chunks are
//! word-aligned; an odd-sized chunk is followed by one pad byte that is not
//! counted in its size field.
//!
//! Reading and writing share a single stream handle that is passed into
//! every operation. Each chunk keeps its own explicit offsets rather than
//! trusting ambient file position, so chunk instances stay valid no matter
//! what else moved the stream in between.

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use crate::error::{WavError, WavResult};

/// Four-byte RIFF chunk identifier
pub type ChunkId = [u8; 4];

/// Root container chunk id
pub const ID_RIFF: ChunkId = *b"RIFF";
/// Form type that follows the RIFF header in a WAVE file
pub const ID_WAVE: ChunkId = *b"WAVE";
/// Format description chunk id
pub const ID_FMT: ChunkId = *b"fmt ";
/// Sample data chunk id
pub const ID_DATA: ChunkId = *b"data";

/// On-stream footprint of a chunk payload, pad byte included.
fn padded(size: u32) -> u64 {
    u64::from(size) + u64::from(size & 1)
}

/// A chunk parsed from an existing stream.
///
/// Owns the byte range `[data_start, data_start + size)` of the backing
/// stream and a cursor within it; reads never cross the declared extent.
#[derive(Debug, Clone)]
pub struct ReadChunk {
    id: ChunkId,
    size: u32,
    data_start: u64,
    cursor: u64,
}

impl ReadChunk {
    /// Parse a chunk header at the stream's current position.
    ///
    /// Fails with [`WavError::MalformedHeader`] if fewer than 8 header
    /// bytes are available.
    pub fn open_root<R: Read + Seek>(stream: &mut R) -> WavResult<Self> {
        let start = stream.stream_position()?;
        let mut header = [0u8; 8];
        stream.read_exact(&mut header).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => WavError::MalformedHeader,
            _ => WavError::Io(e),
        })?;
        let id = [header[0], header[1], header[2], header[3]];
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        Ok(ReadChunk {
            id,
            size,
            data_start: start + 8,
            cursor: 0,
        })
    }

    /// The chunk's 4-character id.
    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// Declared payload size in bytes, pad byte excluded.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Bytes left between the cursor and the declared extent.
    pub fn remaining(&self) -> u64 {
        u64::from(self.size) - self.cursor
    }

    /// Copy `buf.len()` bytes from the chunk cursor, advancing it.
    ///
    /// Fails with [`WavError::TruncatedChunk`] if the request exceeds the
    /// remaining bytes of the chunk, or if the backing stream ends before
    /// the declared extent.
    pub fn read<R: Read + Seek>(&mut self, stream: &mut R, buf: &mut [u8]) -> WavResult<()> {
        if buf.len() as u64 > self.remaining() {
            return Err(WavError::TruncatedChunk);
        }
        stream.seek(SeekFrom::Start(self.data_start + self.cursor))?;
        stream.read_exact(buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => WavError::TruncatedChunk,
            _ => WavError::Io(e),
        })?;
        self.cursor += buf.len() as u64;
        Ok(())
    }

    /// Advance the cursor by `n` bytes without reading them.
    pub fn skip(&mut self, n: u64) -> WavResult<()> {
        if n > self.remaining() {
            return Err(WavError::TruncatedChunk);
        }
        self.cursor += n;
        Ok(())
    }

    /// Parse child chunk headers from the current cursor until the declared
    /// extent is exhausted.
    ///
    /// Discovery is one level deep: each child is returned with its cursor
    /// at the start of its own payload and is not recursed into. Fails with
    /// [`WavError::MalformedHeader`] if a child claims more bytes than the
    /// parent has left.
    pub fn discover_subchunks<R: Read + Seek>(
        &mut self,
        stream: &mut R,
    ) -> WavResult<Vec<ReadChunk>> {
        let mut children = Vec::new();
        while self.remaining() > 0 {
            if self.remaining() < 8 {
                return Err(WavError::MalformedHeader);
            }
            stream.seek(SeekFrom::Start(self.data_start + self.cursor))?;
            let child = ReadChunk::open_root(stream)?;
            self.cursor += 8;
            if u64::from(child.size) > self.remaining() {
                return Err(WavError::MalformedHeader);
            }
            // The last child's pad byte may coincide with the parent's end.
            let advance = padded(child.size).min(self.remaining());
            self.cursor += advance;
            children.push(child);
        }
        Ok(children)
    }
}

/// A chunk being appended to a stream.
///
/// Created with a zero size placeholder; the real size is back-patched when
/// the chunk is [`end`](WriteChunk::end)ed. Writing is depth-first and
/// strictly append-only: at most one chunk in a tree is the active cursor.
#[derive(Debug)]
pub struct WriteChunk {
    id: ChunkId,
    size_field_pos: u64,
    written: u32,
}

impl WriteChunk {
    /// Write the chunk header at the stream's current position.
    ///
    /// The id goes out immediately; 4 zero bytes are reserved for the size
    /// field and its offset remembered for back-patching.
    pub fn begin<W: Write + Seek>(stream: &mut W, id: ChunkId) -> WavResult<Self> {
        stream.write_all(&id)?;
        let size_field_pos = stream.stream_position()?;
        stream.write_all(&[0u8; 4])?;
        Ok(WriteChunk {
            id,
            size_field_pos,
            written: 0,
        })
    }

    /// The chunk's 4-character id.
    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// Running payload size in bytes.
    pub fn written(&self) -> u32 {
        self.written
    }

    /// Append bytes to the chunk payload, growing the running size.
    pub fn write<W: Write + Seek>(&mut self, stream: &mut W, bytes: &[u8]) -> WavResult<()> {
        let len = u32::try_from(bytes.len())
            .ok()
            .and_then(|n| self.written.checked_add(n))
            .ok_or(WavError::InvalidParameter("chunk exceeds the 4 GiB RIFF limit"))?;
        stream.write_all(bytes)?;
        self.written = len;
        Ok(())
    }

    /// Account for a closed child chunk's on-stream footprint.
    ///
    /// The child's header and padded payload were appended through the
    /// shared stream, so the parent's running size must absorb them even
    /// though it never saw the bytes.
    pub fn absorb(&mut self, on_stream: u32) {
        self.written += on_stream;
    }

    /// Finalize the chunk: pad to the word boundary, back-patch the size
    /// field, and return the total on-stream footprint (header + padded
    /// payload) for the parent to [`absorb`](WriteChunk::absorb).
    ///
    /// Consuming `self` makes write-after-close unrepresentable. The pad
    /// byte, if any, is not counted in the recorded size.
    pub fn end<W: Write + Seek>(self, stream: &mut W) -> WavResult<u32> {
        let pad = self.written & 1;
        if pad == 1 {
            stream.write_all(&[0u8])?;
        }
        let end = stream.stream_position()?;
        stream.seek(SeekFrom::Start(self.size_field_pos))?;
        stream.write_all(&self.written.to_le_bytes())?;
        stream.seek(SeekFrom::Start(end))?;
        Ok(8 + self.written + pad)
    }
}
