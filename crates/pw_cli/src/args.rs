// crates/pw_cli/src/args.rs
//
// Argument parsing & validation for the pw CLI.
// - Seed accepts decimal u64 or 0x-hex up to 16 nybbles
// - --keep-order is an alias for --ordering keep
// - --no-verify together with --require-verified is contradictory and
//   rejected before anything runs

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use pw_core::OrderingPlan;
use pw_pipeline::RunOptions;
use pw_report::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "pw",
    version,
    about = "Pairwise (2-way) test suite generation, verification, and minimality certification"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate an optimized pairwise suite from a model file
    Generate(GenerateArgs),
    /// Verify that an existing suite covers every value pair of a model
    Verify(VerifyArgs),
    /// Check that the external generator binary is resolvable and runnable
    Doctor(DoctorArgs),
    /// Print version information
    Version,
    /// Print third-party license information
    Licenses,
    /// Interactively build a model and generate a suite
    Wizard(WizardArgs),
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Model file path; '-' reads the model from stdin
    pub model: PathBuf,

    /// Parameter ordering handed to the generator
    #[arg(long, value_parser = ["auto", "keep"], default_value = "auto")]
    pub ordering: String,

    /// Alias for --ordering keep
    #[arg(long)]
    pub keep_order: bool,

    /// Maximum generator invocations
    #[arg(long, default_value_t = 25)]
    pub tries: u32,

    /// Hard upper clamp on --tries
    #[arg(long, default_value_t = 1000)]
    pub max_tries: u32,

    /// Base seed: decimal u64 or 0x-prefixed hex (<= 16 hex digits)
    #[arg(long, default_value = "0")]
    pub seed: String,

    /// Fixed seed progression and seed-based tie-breaking
    #[arg(long)]
    pub deterministic: bool,

    /// Interaction strength (the lower bound exists only at 2)
    #[arg(long, default_value_t = 2)]
    pub strength: u32,

    /// Stop as soon as a verified suite matches the lower bound
    #[arg(long)]
    pub early_stop: bool,

    /// Accept suites without the in-process coverage proof
    #[arg(long)]
    pub no_verify: bool,

    /// Never emit an unverified suite (implied unless --no-verify)
    #[arg(long)]
    pub require_verified: bool,

    /// Per-attempt wall budget in seconds
    #[arg(long, default_value_t = 30.0)]
    pub pict_timeout_sec: f64,

    /// Global wall budget in seconds
    #[arg(long, default_value_t = 300.0)]
    pub total_timeout_sec: f64,

    /// Output form
    #[arg(long, value_parser = ["table", "delim", "struct"], default_value = "table")]
    pub format: String,

    /// Write the artifact to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Per-attempt progress on the diagnostic stream
    #[arg(long)]
    pub verbose: bool,

    /// Explicit path to the external generator binary
    #[arg(long)]
    pub pict_bin: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Model file path
    #[arg(long)]
    pub model: PathBuf,

    /// Suite file path (TSV or CSV; header of parameter names)
    #[arg(long)]
    pub suite: PathBuf,

    /// Suite delimiter; default is by extension (.csv => comma, else tab)
    #[arg(long, value_parser = ["tab", "comma"])]
    pub delim: Option<String>,
}

#[derive(Debug, Args)]
pub struct DoctorArgs {
    /// Explicit path to the external generator binary
    #[arg(long)]
    pub pict_bin: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct WizardArgs {
    /// Explicit path to the external generator binary
    #[arg(long)]
    pub pict_bin: Option<PathBuf>,
}

impl GenerateArgs {
    /// Fold the flags into driver options. Range errors are reported by
    /// `RunOptions::validate`; this only handles shapes clap cannot.
    pub fn to_run_options(&self) -> Result<RunOptions, String> {
        let seed = parse_seed_u64(&self.seed)?;
        let ordering = if self.keep_order || self.ordering == "keep" {
            OrderingPlan::Keep
        } else {
            OrderingPlan::Auto
        };
        let verify = !self.no_verify;
        Ok(RunOptions {
            ordering,
            tries: self.tries,
            max_tries: self.max_tries,
            seed,
            deterministic: self.deterministic,
            strength: self.strength,
            early_stop: self.early_stop,
            verify,
            // Explicit --require-verified survives --no-verify so the
            // contradiction is rejected by validation instead of ignored.
            require_verified: verify || self.require_verified,
            pict_timeout_sec: self.pict_timeout_sec,
            total_timeout_sec: self.total_timeout_sec,
        })
    }

    pub fn output_format(&self) -> OutputFormat {
        match self.format.as_str() {
            "delim" => OutputFormat::Delim,
            "struct" => OutputFormat::Structured,
            _ => OutputFormat::Table,
        }
    }
}

/// Parse a seed as u64: decimal or 0x-hex (1..=16 nybbles).
pub fn parse_seed_u64(s: &str) -> Result<u64, String> {
    if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if rest.is_empty() || rest.len() > 16 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid seed: {s}"));
        }
        u64::from_str_radix(rest, 16).map_err(|_| format!("invalid seed: {s}"))
    } else {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("invalid seed: {s}"));
        }
        s.parse::<u64>().map_err(|_| format!("invalid seed: {s}"))
    }
}
