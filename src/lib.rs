//! # wavpcm
//!
//! Streaming RIFF/WAVE PCM reader and writer built on a generic chunk model.
//!
//! ## Overview
//!
//! A WAVE file is a RIFF container: nested chunks with 4-character ids and
//! little-endian size fields. This crate models that container directly —
//! [`chunk::ReadChunk`] and [`chunk::WriteChunk`] own byte ranges of a
//! shared stream, discover children lazily, and back-patch deferred size
//! fields on close — and layers a frame-based [`WaveReader`] /
//! [`WaveWriter`] pair plus a float [`decode`] / [`encode`] codec on top.
//! Files stream through a handle; nothing loads the whole file into memory.
//!
//! Only uncompressed PCM at 8/16/24/32-bit depths is supported; any other
//! format tag is a recognized error.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wavpcm::{decode, encode};
//!
//! let ok = encode("out.wav", &samples, 44100, 2, 1)?;
//! let audio = decode("out.wav")?;
//! println!("{} frames at {} Hz", audio.samples.len(), audio.frame_rate);
//! ```
//!
//! ## Features
//!
//! - `tracing`: instrument the codec entry points via tracing

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

pub mod chunk;
pub mod error;
pub mod pcm;
pub mod read;
pub mod write;

pub use error::{WavError, WavResult};
pub use pcm::{decode, encode, Decoded};
pub use read::{WaveFormat, WaveReader};
pub use write::WaveWriter;
