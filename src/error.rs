// Fault discipline shared by the loader, the codec, the envelope and the
// pipelines.
//
// Every fallible boundary returns `Result<_, Fault>`. A `Fault` records the
// pipeline stage that failed, the underlying error kind and the source
// location of the check that raised it. Nothing below the CLI terminates the
// process; `cli::run` is the only place a fault becomes an exit status.

use std::fmt;
use std::io;
use std::panic::Location;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecError;
use crate::envelope::EnvelopeError;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Pipeline stage in which a fault was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading an input file into memory.
    Load,
    /// Delta codec encode (old + new -> delta).
    Encode,
    /// Wrapping the delta in a compressed frame.
    Compress,
    /// Unwrapping a compressed frame back into the delta.
    Decompress,
    /// Delta codec decode (old + delta -> new).
    Decode,
    /// Writing the artifact or the reconstructed file.
    Write,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Encode => "encode",
            Self::Compress => "compress",
            Self::Decompress => "decompress",
            Self::Decode => "decode",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Error kinds
// ---------------------------------------------------------------------------

/// What went wrong, independent of where.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// An input file exists and opened, but reading it failed.
    #[error("{}: read failed: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    /// Fewer bytes were read than the file reported at open time.
    #[error("{}: short read: expected {expected} bytes, got {actual}", .path.display())]
    ShortRead {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// The destination could not be created or fully written.
    #[error("{}: write failed: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The delta codec rejected its input or failed internally.
    #[error("delta codec: {0}")]
    Codec(#[from] CodecError),

    /// The compression envelope rejected a frame or failed internally.
    #[error("compression envelope: {0}")]
    Envelope(#[from] EnvelopeError),
}

// ---------------------------------------------------------------------------
// Fault
// ---------------------------------------------------------------------------

/// A fatal pipeline fault: the stage, the error kind and the check site.
#[derive(Debug, Error)]
#[error("{stage}: {kind} (at {}:{})", .location.file(), .location.line())]
pub struct Fault {
    stage: Stage,
    #[source]
    kind: ErrorKind,
    location: &'static Location<'static>,
}

impl Fault {
    /// Build a fault located at the caller.
    #[track_caller]
    pub fn new(stage: Stage, kind: impl Into<ErrorKind>) -> Self {
        Self {
            stage,
            kind: kind.into(),
            location: Location::caller(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Source location of the check that raised this fault.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }
}

// ---------------------------------------------------------------------------
// Check
// ---------------------------------------------------------------------------

/// Converts a boundary error into a [`Fault`] tagged with the stage and the
/// location of the `check` call.
///
/// ```
/// use deltapack::error::{Check, Stage};
/// use deltapack::envelope;
///
/// let fault = envelope::decompress(b"not a frame")
///     .check(Stage::Decompress)
///     .unwrap_err();
/// assert_eq!(fault.stage(), Stage::Decompress);
/// ```
pub trait Check<T> {
    fn check(self, stage: Stage) -> Result<T, Fault>;
}

impl<T, E: Into<ErrorKind>> Check<T> for Result<T, E> {
    #[track_caller]
    fn check(self, stage: Stage) -> Result<T, Fault> {
        // A closure here would report its own location instead of the caller's.
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(Fault::new(stage, err)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn codec_failure() -> Result<Vec<u8>, CodecError> {
        Err(CodecError::Decode {
            codec: "test",
            message: "truncated instruction".into(),
        })
    }

    #[test]
    fn check_passes_values_through() {
        let ok: Result<u32, CodecError> = Ok(7);
        assert_eq!(ok.check(Stage::Encode).unwrap(), 7);
    }

    #[test]
    fn check_records_stage_and_call_site() {
        let line = line!() + 1;
        let fault = codec_failure().check(Stage::Decode).unwrap_err();

        assert_eq!(fault.stage(), Stage::Decode);
        assert_eq!(fault.location().line(), line);
        assert!(fault.location().file().ends_with("error.rs"));
        assert!(matches!(fault.kind(), ErrorKind::Codec(_)));
    }

    #[test]
    fn display_names_stage_kind_and_location() {
        let fault = codec_failure().check(Stage::Decode).unwrap_err();
        let msg = fault.to_string();

        assert!(msg.starts_with("decode: delta codec: test decode failed"), "{msg}");
        assert!(msg.contains("truncated instruction"), "{msg}");
        assert!(msg.contains("error.rs:"), "{msg}");
    }

    #[test]
    fn short_read_message() {
        let fault = Fault::new(
            Stage::Load,
            ErrorKind::ShortRead {
                path: PathBuf::from("old.bin"),
                expected: 10,
                actual: 4,
            },
        );
        assert_eq!(fault.stage(), Stage::Load);
        assert!(
            fault
                .to_string()
                .contains("old.bin: short read: expected 10 bytes, got 4")
        );
    }

    #[test]
    fn source_chain_reaches_kind() {
        use std::error::Error as _;

        let fault = codec_failure().check(Stage::Decode).unwrap_err();
        let source = fault.source().expect("fault should expose its kind");
        assert!(source.to_string().starts_with("delta codec:"));
    }
}
