//! pw_io — I/O crate for the pairwise engine.
//!
//! - Shared error type (`IoError`) with `From` conversions used across modules.
//! - Model text parsing/serialization (`model_text`)
//! - Generator capture and suite-file parsing (`suite`)
//! - External-generator child process (`runner`)
//!
//! No inline implementations here; details live in the file modules.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for pw_io (used by model_text/suite/runner).
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / process errors (open, spawn, temp files).
    #[error("io error: {0}")]
    Path(String),

    /// Input bytes that are not valid UTF-8 (reported as a validation
    /// failure, never a raw decoder fault).
    #[error("input is not valid UTF-8: {0}")]
    Utf8(String),

    /// Malformed model text, with a 1-based line number.
    #[error("model line {line}: {msg}")]
    ModelText { line: usize, msg: String },

    /// Model-level validation (construction invariants).
    #[error("model: {0}")]
    Model(#[from] pw_core::errors::ModelError),

    /// Malformed generator capture (TSV header/rows).
    #[error("generator output: {0}")]
    Capture(String),

    /// Malformed suite file handed to the verifier surface.
    #[error("suite file: {0}")]
    Suite(String),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

pub mod model_text;
pub mod runner;
pub mod suite;

pub use model_text::{parse_model_bytes, parse_model_str, serialize_model};
pub use runner::{GenOutcome, PictRunner};
