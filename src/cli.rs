// Command-line surface for deltapack.
//
//   deltapack diff  <OLD> <NEW> <DIF>
//   deltapack patch <OLD> <DIF> <NEW>
//   deltapack help | config
//
// This is the only place a `Fault` becomes a process exit status.

use std::path::{Path, PathBuf};
use std::process;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use log::{debug, warn};

use crate::envelope::{self, EnvelopeOptions, MAX_LEVEL};
use crate::error::Fault;
use crate::io;
use crate::pipeline::{self, DiffStats, PatchStats, PipelineOptions};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_LEVEL: i32 = MAX_LEVEL;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Binary delta diff/patch with zstd-compressed artifacts.
#[derive(Parser, Debug)]
#[command(
    name = "deltapack",
    version,
    about = "Binary delta diff/patch with zstd-compressed artifacts",
    arg_required_else_help = true,
    subcommand_required = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Quiet mode (errors only).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Report byte counts and ratios (use twice for stage-level detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write a compressed delta that turns OLD into NEW.
    #[command(visible_alias = "d")]
    Diff(DiffArgs),
    /// Rebuild NEW from OLD and a delta written by `diff`.
    #[command(visible_alias = "p")]
    Patch(PatchArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct DiffArgs {
    /// Old file (missing means empty).
    #[arg(value_name = "OLD", value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// New file.
    #[arg(value_name = "NEW", value_hint = ValueHint::FilePath)]
    new: PathBuf,

    /// Delta artifact to write.
    #[arg(value_name = "DIF", value_hint = ValueHint::FilePath)]
    dif: PathBuf,

    /// zstd compression level for the artifact.
    #[arg(long, short = 'l', value_parser = clap::value_parser!(i32).range(1..=MAX_LEVEL as i64), default_value_t = DEFAULT_LEVEL)]
    level: i32,

    /// Leave the content checksum out of the artifact frame.
    #[arg(long = "no-checksum")]
    no_checksum: bool,
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// Old file (missing means empty).
    #[arg(value_name = "OLD", value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// Delta artifact written by `diff`.
    #[arg(value_name = "DIF", value_hint = ValueHint::FilePath)]
    dif: PathBuf,

    /// Reconstructed file to write.
    #[arg(value_name = "NEW", value_hint = ValueHint::FilePath)]
    new: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Diff {
        old: PathBuf,
        new: PathBuf,
        dif: PathBuf,
    },
    Patch {
        old: PathBuf,
        dif: PathBuf,
        new: PathBuf,
    },
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    level: i32,
    checksum: bool,
}

fn resolve_options(cli: Cli) -> Options {
    let (command, level, checksum) = match cli.command {
        Cmd::Diff(args) => (
            Command::Diff {
                old: args.old,
                new: args.new,
                dif: args.dif,
            },
            args.level,
            !args.no_checksum,
        ),
        Cmd::Patch(args) => (
            Command::Patch {
                old: args.old,
                dif: args.dif,
                new: args.new,
            },
            DEFAULT_LEVEL,
            true,
        ),
        Cmd::Config => (Command::Config, DEFAULT_LEVEL, true),
    };

    Options {
        command,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        level,
        checksum,
    }
}

fn build_pipeline_options(opts: &Options) -> PipelineOptions {
    PipelineOptions {
        envelope: EnvelopeOptions {
            level: opts.level,
            checksum: opts.checksum,
        },
        ..Default::default()
    }
}

/// Exit status for a clap parse failure: 0 for help/version, 1 otherwise.
fn usage_exit_code(kind: ClapErrorKind) -> i32 {
    match kind {
        ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn log_filter(opts: &Options) -> &'static str {
    if opts.quiet {
        return "error";
    }
    match opts.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("deltapack".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = build_pipeline_options(&resolve_options(cli));
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("deltapack version {version}");

    let file_io = cfg!(feature = "file-io") as u8;
    let levels = zstd::compression_level_range();

    eprintln!("CODEC=gdelta");
    eprintln!("ENVELOPE=zstd {}", zstd::zstd_safe::version_string());
    eprintln!("FILE_IO={file_io}");
    eprintln!("DEFAULT_LEVEL={DEFAULT_LEVEL}");
    eprintln!("ZSTD_LEVELS={}..={}", levels.start(), levels.end());
    eprintln!("COMPRESS_BOUND(1MiB)={}", envelope::compress_bound(1 << 20));

    0
}

// ---------------------------------------------------------------------------
// Diff / patch commands
// ---------------------------------------------------------------------------

fn cmd_diff(opts: &Options, old: &Path, new: &Path, dif: &Path) -> i32 {
    let pipeline_opts = build_pipeline_options(opts);
    let stats = match pipeline::diff_file(old, new, dif, &pipeline_opts) {
        Ok(stats) => stats,
        Err(fault) => return fail(&fault),
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "deltapack: diff: old size: {}, new size: {}, delta size: {}, artifact size: {} \
             (ratio {:.3}, {:.1}% of new)",
            stats.old_size,
            stats.new_size,
            stats.delta_size,
            stats.artifact_size,
            stats.ratio(),
            stats.savings() * 100.0
        );
    }

    if opts.json_output {
        print_json(diff_json(&stats));
    }

    0
}

fn cmd_patch(opts: &Options, old: &Path, dif: &Path, new: &Path) -> i32 {
    let pipeline_opts = build_pipeline_options(opts);
    let stats = match pipeline::patch_file(old, dif, new, &pipeline_opts) {
        Ok(stats) => stats,
        Err(fault) => return fail(&fault),
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "deltapack: patch: old size: {}, artifact size: {}, delta size: {}, output size: {}",
            stats.old_size, stats.artifact_size, stats.delta_size, stats.new_size
        );
    }

    if opts.json_output {
        print_json(patch_json(&stats));
    }

    0
}

fn diff_json(stats: &DiffStats) -> serde_json::Value {
    serde_json::json!({
        "command": "diff",
        "old_size": stats.old_size,
        "new_size": stats.new_size,
        "delta_size": stats.delta_size,
        "artifact_size": stats.artifact_size,
        "ratio": stats.ratio(),
        "level": stats.level,
        "new_sha256": stats.new_sha256.map(|d| io::hex(&d)),
    })
}

fn patch_json(stats: &PatchStats) -> serde_json::Value {
    serde_json::json!({
        "command": "patch",
        "old_size": stats.old_size,
        "artifact_size": stats.artifact_size,
        "delta_size": stats.delta_size,
        "output_size": stats.new_size,
        "output_sha256": stats.new_sha256.map(|d| io::hex(&d)),
    })
}

fn print_json(value: serde_json::Value) {
    match serde_json::to_string_pretty(&value) {
        Ok(s) => eprintln!("{s}"),
        Err(e) => warn!("cannot render stats as JSON: {e}"),
    }
}

/// Report a fault as a one-line diagnostic; returns the exit status.
fn fail(fault: &Fault) -> i32 {
    eprintln!("deltapack: {fault}");

    let mut source = std::error::Error::source(fault);
    while let Some(cause) = source {
        debug!("caused by: {cause}");
        source = cause.source();
    }
    1
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = usage_exit_code(e.kind());
            let _ = e.print();
            process::exit(code);
        }
    };
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match &opts.command {
        Command::Diff { old, new, dif } => cmd_diff(&opts, old, new, dif),
        Command::Patch { old, dif, new } => cmd_patch(&opts, old, dif, new),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
