// Delta codec seam.
//
// The pipelines depend only on the round-trip contract
// `decode(encode(new, old), old) == new`. How a codec finds matches and lays
// out its copy/literal instructions is its own business.
//
//   - `DeltaCodec` — the contract (pure, allocates its output)
//   - `GDelta`     — GEAR rolling-hash codec from the `gdelta` crate

use std::panic;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure reported by a delta codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{codec} encode failed: {message}")]
    Encode { codec: &'static str, message: String },

    /// The delta is malformed or was not produced against this old buffer.
    #[error("{codec} decode failed: {message}")]
    Decode { codec: &'static str, message: String },
}

// ---------------------------------------------------------------------------
// DeltaCodec trait
// ---------------------------------------------------------------------------

/// Computes and applies the transformation between two byte buffers.
///
/// Both operations are pure functions of their inputs. The returned buffer
/// is owned by the caller and released when it goes out of scope.
///
/// # Implementing a custom codec
///
/// ```
/// use deltapack::codec::{CodecError, DeltaCodec};
///
/// /// Stores `new` verbatim; ignores `old` entirely.
/// struct Verbatim;
///
/// impl DeltaCodec for Verbatim {
///     fn name(&self) -> &'static str { "verbatim" }
///     fn encode(&self, new: &[u8], _old: &[u8]) -> Result<Vec<u8>, CodecError> {
///         Ok(new.to_vec())
///     }
///     fn decode(&self, delta: &[u8], _old: &[u8]) -> Result<Vec<u8>, CodecError> {
///         Ok(delta.to_vec())
///     }
/// }
///
/// let delta = Verbatim.encode(b"new", b"old").unwrap();
/// assert_eq!(Verbatim.decode(&delta, b"old").unwrap(), b"new");
/// ```
pub trait DeltaCodec: Send + Sync {
    /// Short identifier used in diagnostics.
    fn name(&self) -> &'static str;

    /// Produce a delta that rebuilds `new` from `old`.
    ///
    /// Must accept any content and any lengths, including zero.
    fn encode(&self, new: &[u8], old: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Rebuild the new buffer from `delta` and `old`.
    ///
    /// Must return an error rather than garbage whenever the delta is
    /// detectably malformed (truncated, foreign, out-of-range copies).
    fn decode(&self, delta: &[u8], old: &[u8]) -> Result<Vec<u8>, CodecError>;
}

// ---------------------------------------------------------------------------
// GDelta
// ---------------------------------------------------------------------------

/// The default codec: GEAR-hash matching with varint copy/literal
/// instructions. Holds no state, so one instance can serve any number of
/// threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct GDelta;

impl DeltaCodec for GDelta {
    fn name(&self) -> &'static str {
        "gdelta"
    }

    fn encode(&self, new: &[u8], old: &[u8]) -> Result<Vec<u8>, CodecError> {
        gdelta::encode(new, old).map_err(|e| CodecError::Encode {
            codec: self.name(),
            message: e.to_string(),
        })
    }

    fn decode(&self, delta: &[u8], old: &[u8]) -> Result<Vec<u8>, CodecError> {
        let reject = |message: String| CodecError::Decode {
            codec: self.name(),
            message,
        };

        validate_gdelta(delta, old.len()).map_err(|e| reject(e.to_string()))?;

        match panic::catch_unwind(|| gdelta::decode(delta, old)) {
            Ok(Ok(new)) => Ok(new),
            Ok(Err(e)) => Err(reject(e.to_string())),
            Err(_) => Err(reject("decoder panicked on malformed delta".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// gdelta stream validation
// ---------------------------------------------------------------------------
//
// Layout: varint(instruction_len) | instructions | literal data
//
// Each instruction is a head byte (bit 7 = copy, bit 6 = more, bits 0..6 =
// low length bits), an optional varint with the remaining length bits, and
// for copies a varint base offset. Literal instructions consume the data
// section in order.
//
// The scan walks the stream the same way the decoder does, but with checked
// arithmetic, so every length and offset is known to be in range before the
// decoder sees it.

const MAX_VARINT_LEN: usize = 10;
const HEAD_LENGTH_BITS: u32 = 6;

#[derive(Debug, Error, PartialEq, Eq)]
enum StreamError {
    #[error("unexpected end of delta at byte {0}")]
    Truncated(usize),
    #[error("varint at byte {0} is longer than 10 bytes")]
    VarintTooLong(usize),
    #[error("instruction section of {len} bytes exceeds the {available} bytes left")]
    InstructionsTooLong { len: u64, available: usize },
    #[error("copy of {length} bytes at offset {offset} exceeds base size {base}")]
    CopyOutOfRange { offset: u64, length: u64, base: usize },
    #[error("literal of {length} bytes overruns the data section")]
    LiteralOutOfRange { length: u64 },
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn u8(&mut self) -> Result<u8, StreamError> {
        let byte = *self.bytes.get(self.pos).ok_or(StreamError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    fn varint(&mut self) -> Result<u64, StreamError> {
        let start = self.pos;
        let mut value = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.u8()?;
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(StreamError::VarintTooLong(start))
    }
}

fn validate_gdelta(delta: &[u8], base_len: usize) -> Result<(), StreamError> {
    let mut cur = Cursor {
        bytes: delta,
        pos: 0,
    };

    let inst_len = cur.varint()?;
    let available = delta.len() - cur.pos;
    let inst_end = match usize::try_from(inst_len) {
        Ok(len) if len <= available => cur.pos + len,
        _ => {
            return Err(StreamError::InstructionsTooLong {
                len: inst_len,
                available,
            });
        }
    };

    let data_len = (delta.len() - inst_end) as u64;
    let mut literal_total = 0u64;

    while cur.pos < inst_end {
        let head = cur.u8()?;
        let mut length = u64::from(head & 0x3f);
        if head & 0x40 != 0 {
            length |= cur.varint()? << HEAD_LENGTH_BITS;
        }

        if head & 0x80 != 0 {
            let offset = cur.varint()?;
            match offset.checked_add(length) {
                Some(end) if end <= base_len as u64 => {}
                _ => {
                    return Err(StreamError::CopyOutOfRange {
                        offset,
                        length,
                        base: base_len,
                    });
                }
            }
        } else {
            literal_total = match literal_total.checked_add(length) {
                Some(total) if total <= data_len => total,
                _ => return Err(StreamError::LiteralOutOfRange { length }),
            };
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
