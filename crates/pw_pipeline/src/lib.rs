//! pw_pipeline — Deterministic orchestration of the pairwise engine.
//!
//! The driver repeatedly invokes the external generator with different
//! seeds, independently verifies each produced suite, tracks the smallest
//! verified suite under a strictly total selection ordering, and stops
//! early when a verified suite hits the information-theoretic lower bound.
//!
//! Determinism contract: attempts are strictly sequential (one child at a
//! time), the seed sequence is a pure function of the base seed, and the
//! only clock is `std::time::Instant`. The sole nondeterminism permitted
//! anywhere comes from the external generator's own seed contract.

#![forbid(unsafe_code)]

use std::time::Duration;

use pw_algo::CoverageReport;
use pw_core::{Model, OrderingPlan};
use pw_io::{GenOutcome, PictRunner};
use thiserror::Error;

pub mod driver;

pub use driver::optimize;

/// Seam between the driver and the generator process, so the search loop is
/// testable without spawning children.
pub trait SuiteGenerator {
    fn generate(
        &self,
        model: &Model,
        plan: OrderingPlan,
        seed: u64,
        strength: u32,
        timeout: Duration,
    ) -> GenOutcome;
}

impl SuiteGenerator for PictRunner {
    fn generate(
        &self,
        model: &Model,
        plan: OrderingPlan,
        seed: u64,
        strength: u32,
        timeout: Duration,
    ) -> GenOutcome {
        self.run(model, plan, seed, strength, timeout)
    }
}

/// Recognized driver options. Defaults match the CLI surface.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub ordering: OrderingPlan,
    /// Maximum generator invocations.
    pub tries: u32,
    /// Hard upper clamp on `tries`.
    pub max_tries: u32,
    /// Base for the seed sequence.
    pub seed: u64,
    /// Fixed progression seed, seed+1, ... and seed-based tie-breaking.
    pub deterministic: bool,
    /// Interaction strength (>= 2; the lower bound exists only at 2).
    pub strength: u32,
    /// Stop as soon as a verified suite of size LB is found.
    pub early_stop: bool,
    /// Run the in-process coverage proof on every produced suite.
    pub verify: bool,
    /// Never select an unverified suite as best (implied by `verify`).
    pub require_verified: bool,
    /// Per-attempt wall budget, seconds.
    pub pict_timeout_sec: f64,
    /// Global wall budget for the whole run, seconds.
    pub total_timeout_sec: f64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ordering: OrderingPlan::Auto,
            tries: 25,
            max_tries: 1000,
            seed: 0,
            deterministic: false,
            strength: 2,
            early_stop: false,
            verify: true,
            require_verified: true,
            pict_timeout_sec: 30.0,
            total_timeout_sec: 300.0,
        }
    }
}

/// Option-validation failures (exit category 2).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("strength must be at least 2, got {0}")]
    StrengthTooLow(u32),
    #[error("tries must be at least 1")]
    NoTries,
    #[error("tries {tries} exceeds max-tries {max}")]
    TriesExceedMax { tries: u32, max: u32 },
    #[error("{name} must be a positive number of seconds no greater than 1e9, got {value}")]
    BadTimeout { name: &'static str, value: f64 },
    #[error("--require-verified contradicts --no-verify")]
    ContradictoryVerify,
}

/// Upper bound on timeout flags; keeps `Duration::from_secs_f64` in range.
const MAX_TIMEOUT_SEC: f64 = 1e9;

impl RunOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strength < 2 {
            return Err(ConfigError::StrengthTooLow(self.strength));
        }
        if self.tries < 1 {
            return Err(ConfigError::NoTries);
        }
        if self.tries > self.max_tries {
            return Err(ConfigError::TriesExceedMax {
                tries: self.tries,
                max: self.max_tries,
            });
        }
        for (name, value) in [
            ("pict-timeout-sec", self.pict_timeout_sec),
            ("total-timeout-sec", self.total_timeout_sec),
        ] {
            if !(value.is_finite() && value > 0.0 && value <= MAX_TIMEOUT_SEC) {
                return Err(ConfigError::BadTimeout { name, value });
            }
        }
        if self.require_verified && !self.verify {
            return Err(ConfigError::ContradictoryVerify);
        }
        Ok(())
    }

    /// Non-fatal configuration notes for the diagnostic stream.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.total_timeout_sec < self.pict_timeout_sec {
            out.push(format!(
                "total-timeout-sec ({}) is smaller than pict-timeout-sec ({}); \
                 the total budget caps every attempt",
                self.total_timeout_sec, self.pict_timeout_sec
            ));
        }
        out
    }
}

/// One generator execution, classified.
#[derive(Clone, Debug)]
pub enum AttemptOutcome {
    /// Suite accepted without a coverage proof (`verify = false`).
    Suite { rows: Vec<Vec<String>> },
    /// Suite proven to cover every pair.
    Verified { rows: Vec<Vec<String>> },
    /// Suite produced but the proof failed; the report carries the defects.
    Unverified {
        rows: Vec<Vec<String>>,
        report: CoverageReport,
    },
    Timeout,
    GeneratorError { detail: String },
}

impl AttemptOutcome {
    /// Suite size, when a suite was produced at all.
    pub fn n(&self) -> Option<usize> {
        self.rows().map(<[Vec<String>]>::len)
    }

    pub fn rows(&self) -> Option<&[Vec<String>]> {
        match self {
            AttemptOutcome::Suite { rows }
            | AttemptOutcome::Verified { rows }
            | AttemptOutcome::Unverified { rows, .. } => Some(rows),
            _ => None,
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, AttemptOutcome::Verified { .. })
    }
}

/// Append-only record of one attempt.
#[derive(Clone, Debug)]
pub struct RunAttempt {
    pub index: u32,
    pub seed: u64,
    pub outcome: AttemptOutcome,
    pub wall: Duration,
}

/// Final driver output, released to the output formatter.
#[derive(Clone, Debug)]
pub struct RunResult {
    pub attempts: Vec<RunAttempt>,
    /// Index into `attempts` of the selected suite, if any.
    pub best: Option<usize>,
    pub lb: Option<u64>,
    pub early_stopped: bool,
    pub total_timed_out: bool,
    pub strength: u32,
    pub ordering: OrderingPlan,
    pub seed_base: u64,
    pub deterministic: bool,
}

/// Terminal classification of a run, consumed by the exit mapper.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// A best suite exists and may be emitted.
    Success,
    /// Suites were produced but none survived verification; the payload is
    /// the attempt index with the smallest such suite.
    VerificationFailed { attempt: usize },
    /// No suite at all and the run (or its attempts) ran out of wall clock.
    TimedOut,
    /// No suite at all; the payload is the last failing attempt.
    GeneratorFailed { attempt: usize },
}

impl RunResult {
    pub fn best_attempt(&self) -> Option<&RunAttempt> {
        self.best.map(|i| &self.attempts[i])
    }

    pub fn best_rows(&self) -> Option<&[Vec<String>]> {
        self.best_attempt().and_then(|a| a.outcome.rows())
    }

    pub fn best_is_verified(&self) -> bool {
        self.best_attempt()
            .map(|a| a.outcome.is_verified())
            .unwrap_or(false)
    }

    /// Generator invocations consumed.
    pub fn attempts_consumed(&self) -> u32 {
        self.attempts.len() as u32
    }

    /// Classify the run. Precedence when nothing is emittable: a produced
    /// but unproven suite dominates co-occurring timeouts, which dominate
    /// generator errors.
    pub fn verdict(&self) -> Verdict {
        if let Some(best) = self.best_attempt() {
            return match best.outcome {
                AttemptOutcome::Verified { .. } | AttemptOutcome::Suite { .. } => Verdict::Success,
                AttemptOutcome::Unverified { .. } => Verdict::VerificationFailed {
                    attempt: self.best.unwrap_or_default(),
                },
                // Best selection only ever points at a suite-bearing attempt.
                _ => Verdict::GeneratorFailed {
                    attempt: self.best.unwrap_or_default(),
                },
            };
        }

        // Smallest unverified suite, earliest on ties.
        let smallest_unverified = self
            .attempts
            .iter()
            .enumerate()
            .filter(|(_, a)| matches!(a.outcome, AttemptOutcome::Unverified { .. }))
            .min_by_key(|(i, a)| (a.outcome.n().unwrap_or(usize::MAX), *i))
            .map(|(i, _)| i);
        if let Some(attempt) = smallest_unverified {
            return Verdict::VerificationFailed { attempt };
        }

        let any_timeout = self.total_timed_out
            || self
                .attempts
                .iter()
                .any(|a| matches!(a.outcome, AttemptOutcome::Timeout));
        if any_timeout {
            return Verdict::TimedOut;
        }

        let last_generator_error = self
            .attempts
            .iter()
            .rposition(|a| matches!(a.outcome, AttemptOutcome::GeneratorError { .. }));
        if let Some(attempt) = last_generator_error {
            return Verdict::GeneratorFailed { attempt };
        }

        // Unreachable with tries >= 1 unless the total budget expired before
        // the first attempt.
        Verdict::TimedOut
    }
}
