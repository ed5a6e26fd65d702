//! pw_core — Core types for the pairwise suite optimizer.
//!
//! This crate is **I/O-free**. It defines the stable types/APIs used across
//! the engine (`pw_io`, `pw_algo`, `pw_pipeline`, `pw_report`, `pw_cli`):
//!
//! - `Parameter` / `Model`: named dimensions with ordered value lists,
//!   constructed once and immutable thereafter
//! - Generator-safe identifier derivation (ASCII `[A-Za-z0-9_]`)
//! - `OrderingPlan`: the permutation handed to the generator
//! - Pairwise lower bound (`max_{i<j} c_i*c_j`)
//! - Seed sequences (ChaCha20) for the multi-seed search

#![forbid(unsafe_code)]

pub mod bound;
pub mod model;
pub mod seeds;

pub use bound::pairwise_lower_bound;
pub use model::{Model, OrderingPlan, ParamDecl, Parameter};
pub use seeds::SeedSequence;

pub mod errors {
    use std::fmt;

    /// Validation errors raised while constructing a `Model`.
    ///
    /// Line-number attribution for textual sources lives in `pw_io`; these
    /// variants name the offending parameter/value instead so programmatic
    /// construction gets the same checks.
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum ModelError {
        TooFewParameters(usize),
        EmptyParameterName,
        DuplicateDisplayName(String),
        NoValues(String),
        EmptyValue(String),
        DuplicateValue { param: String, value: String },
        NoCoverablePairs,
    }

    impl fmt::Display for ModelError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                ModelError::TooFewParameters(n) => {
                    write!(f, "model needs at least 2 parameters, found {n}")
                }
                ModelError::EmptyParameterName => write!(f, "parameter name is empty"),
                ModelError::DuplicateDisplayName(name) => {
                    write!(f, "duplicate parameter name (case-insensitive): {name}")
                }
                ModelError::NoValues(p) => write!(f, "parameter {p} declares no values"),
                ModelError::EmptyValue(p) => write!(f, "parameter {p} has an empty value label"),
                ModelError::DuplicateValue { param, value } => {
                    write!(f, "parameter {param} repeats value {value}")
                }
                ModelError::NoCoverablePairs => {
                    write!(f, "no parameter has 2 or more values; nothing to cover")
                }
            }
        }
    }

    impl std::error::Error for ModelError {}
}
