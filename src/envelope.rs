// Compression envelope: a zstd frame that always declares its exact
// decompressed size.
//
// compress:   destination pre-sized to `compress_bound`, trimmed to the real
//             frame length afterwards.
// decompress: size read from the frame header first, destination allocated
//             to exactly that size, produced length checked against it.
//
// zstd is deterministic and memory-bound, so no error here is retried.

use std::io;

use thiserror::Error;
use zstd::zstd_safe::{self, CParameter};

/// Highest zstd level; the default, since an artifact is produced once and
/// applied many times.
pub const MAX_LEVEL: i32 = 22;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Contract violations and codec failures of the envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("compression level {level} outside supported range {min}..={max}")]
    InvalidLevel { level: i32, min: i32, max: i32 },

    #[error("input is not a zstd frame or its header is truncated")]
    NotAFrame,

    #[error("frame does not declare its decompressed size")]
    UnknownSize,

    #[error("declared decompressed size {0} cannot be allocated")]
    TooLarge(u64),

    #[error("decompressed {actual} bytes but frame declared {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("zstd: {0}")]
    Codec(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Envelope settings used when compressing. Decompression needs none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeOptions {
    /// zstd compression level.
    pub level: i32,
    /// Append a content checksum to every frame.
    pub checksum: bool,
}

impl Default for EnvelopeOptions {
    fn default() -> Self {
        Self {
            level: MAX_LEVEL,
            checksum: true,
        }
    }
}

impl EnvelopeOptions {
    /// Reject levels zstd does not support.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        let range = zstd::compression_level_range();
        if range.contains(&self.level) {
            Ok(())
        } else {
            Err(EnvelopeError::InvalidLevel {
                level: self.level,
                min: *range.start(),
                max: *range.end(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Compress
// ---------------------------------------------------------------------------

/// Worst-case frame size for `len` input bytes.
pub fn compress_bound(len: usize) -> usize {
    zstd_safe::compress_bound(len)
}

/// Wrap `raw` in a single zstd frame.
///
/// The frame always carries the content size, so [`decompress`] never has
/// to guess. The returned buffer is never longer than
/// [`compress_bound`]`(raw.len())`.
pub fn compress(raw: &[u8], opts: &EnvelopeOptions) -> Result<Vec<u8>, EnvelopeError> {
    opts.validate()?;

    let mut compressor = zstd::bulk::Compressor::new(opts.level)?;
    compressor.set_parameter(CParameter::ContentSizeFlag(true))?;
    compressor.set_parameter(CParameter::ChecksumFlag(opts.checksum))?;

    let bound = compress_bound(raw.len());
    let mut frame = Vec::with_capacity(bound);
    let written = compressor.compress_to_buffer(raw, &mut frame)?;
    debug_assert_eq!(written, frame.len());
    frame.truncate(written);
    frame.shrink_to_fit();

    log::trace!(
        "envelope: {} -> {} bytes (bound {bound}, level {})",
        raw.len(),
        frame.len(),
        opts.level
    );
    Ok(frame)
}

// ---------------------------------------------------------------------------
// Decompress
// ---------------------------------------------------------------------------

/// Decompressed size declared in the frame header.
pub fn content_size(frame: &[u8]) -> Result<u64, EnvelopeError> {
    match zstd_safe::get_frame_content_size(frame) {
        Ok(Some(size)) => Ok(size),
        Ok(None) => Err(EnvelopeError::UnknownSize),
        Err(_) => Err(EnvelopeError::NotAFrame),
    }
}

/// Unwrap a frame produced by [`compress`].
pub fn decompress(frame: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let expected = content_size(frame)?;
    let capacity = usize::try_from(expected).map_err(|_| EnvelopeError::TooLarge(expected))?;

    let mut raw = Vec::new();
    raw.try_reserve_exact(capacity)
        .map_err(|_| EnvelopeError::TooLarge(expected))?;

    let mut decompressor = zstd::bulk::Decompressor::new()?;
    let written = decompressor.decompress_to_buffer(frame, &mut raw)?;

    let actual = written as u64;
    if actual != expected {
        return Err(EnvelopeError::SizeMismatch { expected, actual });
    }

    log::trace!("envelope: {} -> {actual} bytes", frame.len());
    Ok(raw)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
