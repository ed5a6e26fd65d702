//! pw_algo — Independent coverage verification for candidate suites.
//!
//! The verifier is the mathematical proof that a suite is valid: for every
//! unordered parameter pair `(i, j)` it tracks which of the `c_i * c_j`
//! value combinations appear in at least one row, and the suite verifies
//! iff every combination is present.
//!
//! Robustness contract: malformed input is reported as structured defects
//! (`SchemaMismatch`, `UnknownValue`, `EmptySuite`), never as a panic or a
//! raw error surface. Deterministic, `O(rows * params^2)`.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use pw_core::Model;

/// Upper bound on missing pairs listed for diagnostics.
pub const MISSING_PAIR_CAP: usize = 20;

/// Upper bound on per-row defects listed before the scan stops recording.
pub const ROW_DEFECT_CAP: usize = 20;

/// One uncovered value combination, in declared parameter order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MissingPair {
    pub param_a: String,
    pub param_b: String,
    pub value_a: String,
    pub value_b: String,
}

impl std::fmt::Display for MissingPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}={} with {}={}",
            self.param_a, self.value_a, self.param_b, self.value_b
        )
    }
}

/// A reason the suite failed verification. Row numbers are 1-based over
/// data rows (the header is not part of the verifier's input).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Defect {
    /// A row's column count does not match the model.
    SchemaMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// A cell holds a label the parameter does not declare.
    UnknownValue {
        row: usize,
        param: String,
        value: String,
    },
    /// No rows at all (a model always has pairs to cover).
    EmptySuite,
    /// Structurally sound but incomplete: the first `MISSING_PAIR_CAP`
    /// uncovered combinations in `(i, j, v_i, v_j)` order, plus the total.
    MissingPairs {
        shown: Vec<MissingPair>,
        total: u64,
    },
}

impl std::fmt::Display for Defect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Defect::SchemaMismatch {
                row,
                expected,
                found,
            } => write!(f, "row {row}: expected {expected} columns, found {found}"),
            Defect::UnknownValue { row, param, value } => {
                write!(f, "row {row}: unknown value {value} for parameter {param}")
            }
            Defect::EmptySuite => write!(f, "suite is empty"),
            Defect::MissingPairs { shown, total } => {
                write!(f, "{total} pair(s) uncovered; first {}", shown.len())
            }
        }
    }
}

/// Verification result. `passed()` is the only success signal; everything
/// else is diagnostics.
#[derive(Clone, Debug)]
pub struct CoverageReport {
    pub rows: usize,
    /// Total number of value combinations the model requires.
    pub required_pairs: u64,
    /// Combinations observed at least once (only meaningful when the scan
    /// saw no structural defects).
    pub covered_pairs: u64,
    pub defects: Vec<Defect>,
}

impl CoverageReport {
    pub fn passed(&self) -> bool {
        self.defects.is_empty()
    }

    /// Missing-pair diagnostics, if that is why verification failed.
    pub fn missing(&self) -> Option<(&[MissingPair], u64)> {
        self.defects.iter().find_map(|d| match d {
            Defect::MissingPairs { shown, total } => Some((shown.as_slice(), *total)),
            _ => None,
        })
    }
}

/// Prove (or refute) that `rows` covers every unordered value pair of
/// `model`. Rows must be in the model's declared parameter order.
pub fn check_pairwise(model: &Model, rows: &[Vec<String>]) -> CoverageReport {
    let n = model.param_count();
    let cards = model.cardinalities();

    // Value label -> index per parameter.
    let lookup: Vec<BTreeMap<&str, usize>> = model
        .params()
        .iter()
        .map(|p| {
            p.values()
                .iter()
                .enumerate()
                .map(|(i, v)| (v.as_str(), i))
                .collect()
        })
        .collect();

    // One coverage bitmap per unordered pair, indexed a * c_j + b.
    let mut pair_of = vec![vec![0usize; n]; n];
    let mut seen: Vec<Vec<bool>> = Vec::new();
    let mut required_pairs: u64 = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            pair_of[i][j] = seen.len();
            seen.push(vec![false; cards[i] * cards[j]]);
            required_pairs += (cards[i] as u64) * (cards[j] as u64);
        }
    }

    let mut defects: Vec<Defect> = Vec::new();
    let mut structural = false;

    for (r, row) in rows.iter().enumerate() {
        let rowno = r + 1;
        if row.len() != n {
            structural = true;
            if defects.len() < ROW_DEFECT_CAP {
                defects.push(Defect::SchemaMismatch {
                    row: rowno,
                    expected: n,
                    found: row.len(),
                });
            }
            continue;
        }

        let mut idx = Vec::with_capacity(n);
        let mut bad = false;
        for (col, cell) in row.iter().enumerate() {
            match lookup[col].get(cell.as_str()) {
                Some(&v) => idx.push(v),
                None => {
                    structural = true;
                    bad = true;
                    if defects.len() < ROW_DEFECT_CAP {
                        defects.push(Defect::UnknownValue {
                            row: rowno,
                            param: model.params()[col].display_name().to_string(),
                            value: cell.clone(),
                        });
                    }
                }
            }
        }
        if bad {
            continue;
        }

        for i in 0..n {
            for j in (i + 1)..n {
                seen[pair_of[i][j]][idx[i] * cards[j] + idx[j]] = true;
            }
        }
    }

    let mut covered_pairs: u64 = 0;
    if !structural {
        if rows.is_empty() {
            defects.push(Defect::EmptySuite);
        } else {
            let mut shown: Vec<MissingPair> = Vec::new();
            let mut total: u64 = 0;
            for i in 0..n {
                for j in (i + 1)..n {
                    let slab = &seen[pair_of[i][j]];
                    for a in 0..cards[i] {
                        for b in 0..cards[j] {
                            if slab[a * cards[j] + b] {
                                covered_pairs += 1;
                            } else {
                                total += 1;
                                if shown.len() < MISSING_PAIR_CAP {
                                    shown.push(MissingPair {
                                        param_a: model.params()[i].display_name().to_string(),
                                        param_b: model.params()[j].display_name().to_string(),
                                        value_a: model.params()[i].values()[a].clone(),
                                        value_b: model.params()[j].values()[b].clone(),
                                    });
                                }
                            }
                        }
                    }
                }
            }
            if total > 0 {
                defects.push(Defect::MissingPairs { shown, total });
            }
        }
    }

    CoverageReport {
        rows: rows.len(),
        required_pairs,
        covered_pairs,
        defects,
    }
}
