// Diff and patch pipelines.
//
//   diff:  Load(old, new) -> Encode -> Compress   -> Write(artifact)
//   patch: Load(old, dif) -> Decompress -> Decode -> Write(new)
//
// Each stage runs to completion before the next starts. Every buffer is an
// owned `Vec<u8>` scoped to the call, so it is released exactly once on
// every exit path, including early returns on a fault. The destination file
// is only opened once the output buffer is complete.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::codec::{DeltaCodec, GDelta};
use crate::envelope::{self, EnvelopeOptions};
use crate::error::{Check, Fault, Stage};
use crate::io::{self, InputState};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration shared by both pipelines.
#[derive(Clone)]
pub struct PipelineOptions {
    /// Compression envelope settings (used by diff).
    pub envelope: EnvelopeOptions,
    /// Delta codec used to encode and decode.
    pub codec: Arc<dyn DeltaCodec>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            envelope: EnvelopeOptions::default(),
            codec: Arc::new(GDelta),
        }
    }
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("envelope", &self.envelope)
            .field("codec", &self.codec.name())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by the diff pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffStats {
    /// Old input size in bytes.
    pub old_size: u64,
    /// New input size in bytes.
    pub new_size: u64,
    /// Raw codec delta size in bytes.
    pub delta_size: u64,
    /// Compressed artifact size in bytes.
    pub artifact_size: u64,
    /// zstd level used for the envelope.
    pub level: i32,
    /// SHA-256 of the new input (if `file-io` feature is enabled).
    pub new_sha256: Option<[u8; 32]>,
}

impl DiffStats {
    /// Compression ratio achieved by the envelope (artifact / delta).
    pub fn ratio(&self) -> f64 {
        ratio(self.artifact_size, self.delta_size)
    }

    /// Artifact size relative to shipping the new file whole.
    pub fn savings(&self) -> f64 {
        ratio(self.artifact_size, self.new_size)
    }
}

/// Statistics returned by the patch pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchStats {
    /// Old input size in bytes.
    pub old_size: u64,
    /// Compressed artifact size in bytes.
    pub artifact_size: u64,
    /// Raw codec delta size after decompression.
    pub delta_size: u64,
    /// Reconstructed output size in bytes.
    pub new_size: u64,
    /// SHA-256 of the reconstructed output (if `file-io` feature is enabled).
    pub new_sha256: Option<[u8; 32]>,
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        1.0
    } else {
        part as f64 / whole as f64
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Build a compressed delta artifact that turns `old` into `new`.
///
/// Either input may be empty.
pub fn diff_bytes(
    old: &[u8],
    new: &[u8],
    opts: &PipelineOptions,
) -> Result<(Vec<u8>, DiffStats), Fault> {
    debug!(
        "diff: encoding {} new bytes against {} old bytes ({})",
        new.len(),
        old.len(),
        opts.codec.name()
    );
    let delta = opts.codec.encode(new, old).check(Stage::Encode)?;
    let delta_size = delta.len() as u64;

    debug!("diff: compressing {delta_size} delta bytes at level {}", opts.envelope.level);
    let artifact = envelope::compress(&delta, &opts.envelope).check(Stage::Compress)?;
    drop(delta);

    let stats = DiffStats {
        old_size: old.len() as u64,
        new_size: new.len() as u64,
        delta_size,
        artifact_size: artifact.len() as u64,
        level: opts.envelope.level,
        new_sha256: io::digest(new),
    };
    info!(
        "diff: delta {} bytes, artifact {} bytes (ratio {:.3})",
        stats.delta_size,
        stats.artifact_size,
        stats.ratio()
    );
    Ok((artifact, stats))
}

/// Diff two files and write the artifact to `dif_path`.
///
/// Missing inputs are treated as empty, which yields "create file" or
/// "delete file" artifacts.
pub fn diff_file(
    old_path: &Path,
    new_path: &Path,
    dif_path: &Path,
    opts: &PipelineOptions,
) -> Result<DiffStats, Fault> {
    let old = io::load(old_path)?;
    let new = io::load(new_path)?;
    if new.state() != InputState::Present {
        warn!(
            "{}: new input unavailable, producing a delta to empty content",
            new_path.display()
        );
    }

    let (artifact, stats) = diff_bytes(old.bytes(), new.bytes(), opts)?;
    io::write_output(dif_path, &artifact)?;
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Reconstruct the new buffer from `old` and a delta artifact.
///
/// The artifact must be a frame produced by [`diff_bytes`]; anything else
/// faults at [`Stage::Decompress`] or [`Stage::Decode`].
pub fn patch_bytes(
    old: &[u8],
    artifact: &[u8],
    opts: &PipelineOptions,
) -> Result<(Vec<u8>, PatchStats), Fault> {
    debug!("patch: decompressing {} artifact bytes", artifact.len());
    let delta = envelope::decompress(artifact).check(Stage::Decompress)?;
    let delta_size = delta.len() as u64;

    debug!(
        "patch: decoding {delta_size} delta bytes against {} old bytes ({})",
        old.len(),
        opts.codec.name()
    );
    let new = opts.codec.decode(&delta, old).check(Stage::Decode)?;
    drop(delta);

    let stats = PatchStats {
        old_size: old.len() as u64,
        artifact_size: artifact.len() as u64,
        delta_size,
        new_size: new.len() as u64,
        new_sha256: io::digest(&new),
    };
    info!(
        "patch: artifact {} bytes, delta {} bytes, output {} bytes",
        stats.artifact_size, stats.delta_size, stats.new_size
    );
    Ok((new, stats))
}

/// Apply the artifact at `dif_path` to `old_path`, writing `new_path`.
pub fn patch_file(
    old_path: &Path,
    dif_path: &Path,
    new_path: &Path,
    opts: &PipelineOptions,
) -> Result<PatchStats, Fault> {
    let old = io::load(old_path)?;
    let artifact = io::load(dif_path)?;
    if artifact.state() != InputState::Present {
        warn!("{}: delta artifact unavailable", dif_path.display());
    }

    let (new, stats) = patch_bytes(old.bytes(), artifact.bytes(), opts)?;
    io::write_output(new_path, &new)?;
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
