// crates/pw_pipeline/src/driver.rs
//
// The multi-seed optimization loop.
//
// For each attempt k: check the global budget, take the next seed, hand the
// generator min(per-attempt, remaining-total) of wall clock, classify the
// result through the verification gate, and fold it into the best-so-far
// under the selection ordering. Early-stop fires when a verified suite hits
// the lower bound. Attempts are strictly sequential; RunAttempt records are
// appended in attempt order.
//
// Selection ordering (strictly total):
// 1. verified beats unverified;
// 2. smaller suite beats larger;
// 3. ties: smaller seed when deterministic, else earliest attempt.
// Under `require_verified`, unverified suites never enter the pool.

use std::time::{Duration, Instant};

use pw_algo::check_pairwise;
use pw_core::{pairwise_lower_bound, Model, SeedSequence};
use pw_io::GenOutcome;

use crate::{
    AttemptOutcome, ConfigError, RunAttempt, RunOptions, RunResult, SuiteGenerator,
};

/// Run the best-of-N search. The observer sees every attempt as it lands
/// (the CLI uses it for verbose progress); pass a no-op closure otherwise.
pub fn optimize<G: SuiteGenerator>(
    model: &Model,
    opts: &RunOptions,
    gen: &G,
    mut observe: impl FnMut(&RunAttempt),
) -> Result<RunResult, ConfigError> {
    opts.validate()?;

    let lb = if opts.strength == 2 {
        pairwise_lower_bound(&model.cardinalities())
    } else {
        None
    };

    let mut seeds = SeedSequence::from_base(opts.seed, opts.deterministic);
    let per_attempt = Duration::from_secs_f64(opts.pict_timeout_sec);
    let total_budget = Duration::from_secs_f64(opts.total_timeout_sec);
    let start = Instant::now();

    let mut attempts: Vec<RunAttempt> = Vec::new();
    let mut best: Option<usize> = None;
    let mut early_stopped = false;
    let mut total_timed_out = false;

    for index in 0..opts.tries {
        let elapsed = start.elapsed();
        if elapsed >= total_budget {
            total_timed_out = true;
            break;
        }
        let budget = per_attempt.min(total_budget - elapsed);

        let seed = seeds.next_seed();
        let attempt_start = Instant::now();
        let outcome = match gen.generate(model, opts.ordering, seed, opts.strength, budget) {
            GenOutcome::Rows(rows) => classify(model, rows, opts.verify),
            GenOutcome::Timeout => AttemptOutcome::Timeout,
            GenOutcome::Failed { detail } => AttemptOutcome::GeneratorError { detail },
        };

        attempts.push(RunAttempt {
            index,
            seed,
            outcome,
            wall: attempt_start.elapsed(),
        });
        let current = attempts.len() - 1;
        observe(&attempts[current]);

        if let Some(key) = candidate_key(&attempts[current], opts) {
            let improves = match best {
                None => true,
                Some(i) => candidate_key(&attempts[i], opts)
                    .map(|cur| key < cur)
                    .unwrap_or(true),
            };
            if improves {
                best = Some(current);
            }
        }

        if opts.early_stop && opts.verify && opts.strength == 2 {
            if let (Some(lb), Some(i)) = (lb, best) {
                let a = &attempts[i];
                if a.outcome.is_verified() && a.outcome.n() == Some(lb as usize) {
                    early_stopped = true;
                    break;
                }
            }
        }
    }

    Ok(RunResult {
        attempts,
        best,
        lb,
        early_stopped,
        total_timed_out,
        strength: opts.strength,
        ordering: opts.ordering,
        seed_base: opts.seed,
        deterministic: opts.deterministic,
    })
}

fn classify(model: &Model, rows: Vec<Vec<String>>, verify: bool) -> AttemptOutcome {
    if !verify {
        return AttemptOutcome::Suite { rows };
    }
    let report = check_pairwise(model, &rows);
    if report.passed() {
        AttemptOutcome::Verified { rows }
    } else {
        AttemptOutcome::Unverified { rows, report }
    }
}

/// Total-order key for the selection pool; `None` means not selectable.
/// Lexicographic: (unverified?, n, tie-break). The tie-break is the seed in
/// deterministic mode and the attempt index otherwise.
fn candidate_key(attempt: &RunAttempt, opts: &RunOptions) -> Option<(bool, usize, u64)> {
    let n = attempt.outcome.n()?;
    let verified = attempt.outcome.is_verified();
    if opts.require_verified && !verified {
        return None;
    }
    let tie = if opts.deterministic {
        attempt.seed
    } else {
        u64::from(attempt.index)
    };
    Some((!verified, n, tie))
}
