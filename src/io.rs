// File buffer loader and output writer.
//
// Inputs are read whole into memory, sized by the file length at open time.
// A missing input is not an error: it loads as an empty buffer so that
// "create file" and "delete file" deltas work, and the loader records that
// it happened as an explicit `InputState`. Output writes are checked in full;
// a failed or short write is a fault, never a silently truncated file.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::{Check, ErrorKind, Fault, Stage};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// How an input file was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    /// The file opened and was read in full (possibly zero bytes).
    Present,
    /// The file does not exist; treated as empty.
    Missing,
    /// The file exists but could not be opened; treated as empty.
    Unreadable,
}

/// A fully loaded input file.
#[derive(Debug, Clone)]
pub struct Input {
    path: PathBuf,
    bytes: Vec<u8>,
    state: InputState,
}

impl Input {
    fn empty(path: &Path, state: InputState) -> Self {
        Self {
            path: path.to_path_buf(),
            bytes: Vec::new(),
            state,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn state(&self) -> InputState {
        self.state
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// ---------------------------------------------------------------------------
// load
// ---------------------------------------------------------------------------

/// Load `path` fully into memory.
///
/// Returns an empty [`Input`] (not an error) when the file is missing or
/// cannot be opened. Once open, the whole file must be readable: fewer bytes
/// than the length reported at open time is an [`ErrorKind::ShortRead`]
/// fault.
pub fn load(path: &Path) -> Result<Input, Fault> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            let state = open_failure_state(&e);
            match state {
                InputState::Missing => {
                    debug!("{}: not found, using empty input", path.display())
                }
                _ => warn!("{}: cannot open ({e}), using empty input", path.display()),
            }
            return Ok(Input::empty(path, state));
        }
    };

    let expected = file
        .metadata()
        .map_err(|source| ErrorKind::Read {
            path: path.to_path_buf(),
            source,
        })
        .check(Stage::Load)?
        .len();
    let bytes = read_exact_len(&mut file, expected, path)?;

    info!("{}: read {} bytes", path.display(), bytes.len());
    Ok(Input {
        path: path.to_path_buf(),
        bytes,
        state: InputState::Present,
    })
}

/// Classify an open error: only `NotFound` means the file is missing.
fn open_failure_state(err: &io::Error) -> InputState {
    if err.kind() == io::ErrorKind::NotFound {
        InputState::Missing
    } else {
        InputState::Unreadable
    }
}

/// Read exactly `expected` bytes from `reader`.
///
/// Ending early is an [`ErrorKind::ShortRead`] fault at [`Stage::Load`].
fn read_exact_len<R: Read>(
    reader: &mut R,
    expected: u64,
    path: &Path,
) -> Result<Vec<u8>, Fault> {
    let read_err = |source| ErrorKind::Read {
        path: path.to_path_buf(),
        source,
    };

    let len = usize::try_from(expected)
        .map_err(|_| read_err(io::Error::other("file does not fit in memory")))
        .check(Stage::Load)?;

    let mut bytes = vec![0u8; len];
    let actual = read_full(reader, &mut bytes)
        .map_err(read_err)
        .check(Stage::Load)?;
    if actual < len {
        return Err(Fault::new(
            Stage::Load,
            ErrorKind::ShortRead {
                path: path.to_path_buf(),
                expected,
                actual: actual as u64,
            },
        ));
    }
    Ok(bytes)
}

/// Read until `buf` is full or the reader hits EOF. Returns bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ---------------------------------------------------------------------------
// write_output
// ---------------------------------------------------------------------------

/// Create or truncate `path` and write all of `bytes` to it.
///
/// The destination is only opened here, after the caller has finished
/// building the buffer, so a fault in an earlier stage never touches it.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<(), Fault> {
    write_all_to(path, bytes)
        .map_err(|source| ErrorKind::Write {
            path: path.to_path_buf(),
            source,
        })
        .check(Stage::Write)?;

    info!("{}: wrote {} bytes", path.display(), bytes.len());
    Ok(())
}

fn write_all_to(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.flush()
}

// ---------------------------------------------------------------------------
// Digests
// ---------------------------------------------------------------------------

/// SHA-256 of `bytes`, or `None` when built without `file-io`.
pub fn digest(bytes: &[u8]) -> Option<[u8; 32]> {
    #[cfg(feature = "file-io")]
    {
        use sha2::Digest;
        Some(sha2::Sha256::digest(bytes).into())
    }

    #[cfg(not(feature = "file-io"))]
    {
        let _ = bytes;
        None
    }
}

/// Lowercase hex rendering of a digest.
pub fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
