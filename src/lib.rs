//! Deltapack: binary diff/patch with compressed delta artifacts.
//!
//! The crate provides:
//! - A delta codec seam with a gdelta-backed default (`codec`)
//! - A zstd compression envelope with embedded content size (`envelope`)
//! - Whole-file loading and checked output writes (`io`)
//! - The diff and patch pipelines (`pipeline`)
//! - Fault reporting with stage and source location (`error`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use deltapack::pipeline::{self, PipelineOptions};
//!
//! let old = b"AAAABBBBCCCC";
//! let new = b"AAAABBBBDDDD";
//!
//! let opts = PipelineOptions::default();
//! let (artifact, _stats) = pipeline::diff_bytes(old, new, &opts).unwrap();
//! let (rebuilt, _stats) = pipeline::patch_bytes(old, &artifact, &opts).unwrap();
//! assert_eq!(rebuilt, new);
//! ```

pub mod codec;
pub mod envelope;
pub mod error;
pub mod io;
pub mod pipeline;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Fault, Stage};
