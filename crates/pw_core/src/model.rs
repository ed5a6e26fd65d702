// crates/pw_core/src/model.rs
//
// Parameter model: ordered named dimensions with ordered, distinct value
// labels. Constructed once (textually via pw_io or programmatically via
// `Model::new`), immutable thereafter.
//
// Invariants enforced here:
// - at least 2 parameters;
// - display names unique under case-insensitive comparison;
// - every parameter has at least one non-empty value, values unique
//   (case-sensitive) within a parameter;
// - at least one parameter has >= 2 values (otherwise no pair exists);
// - safe names unique across the model.

use std::collections::BTreeSet;

use crate::errors::ModelError;

/// Raw declaration handed to `Model::new`. Labels are canonicalized
/// (surrounding whitespace stripped, interior whitespace preserved) during
/// construction.
#[derive(Clone, Debug)]
pub struct ParamDecl {
    pub name: String,
    pub values: Vec<String>,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self { name: name.into(), values }
    }
}

/// A named dimension with an ordered list of distinct value labels.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parameter {
    display_name: String,
    safe_name: String,
    values: Vec<String>,
}

impl Parameter {
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Generator-compatible identifier derived from the display name;
    /// unique across the model.
    pub fn safe_name(&self) -> &str {
        &self.safe_name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn cardinality(&self) -> usize {
        self.values.len()
    }
}

/// An ordered sequence of parameters. The declared order is authoritative
/// for every emitted row; reordering exists only on the generator side.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Model {
    params: Vec<Parameter>,
}

impl Model {
    /// Canonicalize and validate declarations into an immutable model.
    pub fn new(decls: Vec<ParamDecl>) -> Result<Self, ModelError> {
        if decls.len() < 2 {
            return Err(ModelError::TooFewParameters(decls.len()));
        }

        let mut seen_display: BTreeSet<String> = BTreeSet::new();
        let mut seen_safe: BTreeSet<String> = BTreeSet::new();
        let mut params = Vec::with_capacity(decls.len());

        for decl in decls {
            let display_name = decl.name.trim().to_string();
            if display_name.is_empty() {
                return Err(ModelError::EmptyParameterName);
            }
            if !seen_display.insert(display_name.to_lowercase()) {
                return Err(ModelError::DuplicateDisplayName(display_name));
            }
            if decl.values.is_empty() {
                return Err(ModelError::NoValues(display_name));
            }

            let mut values = Vec::with_capacity(decl.values.len());
            let mut seen_values: BTreeSet<String> = BTreeSet::new();
            for raw in decl.values {
                let label = raw.trim().to_string();
                if label.is_empty() {
                    return Err(ModelError::EmptyValue(display_name));
                }
                if !seen_values.insert(label.clone()) {
                    return Err(ModelError::DuplicateValue {
                        param: display_name,
                        value: label,
                    });
                }
                values.push(label);
            }

            let safe_name = derive_safe_name(&display_name, &seen_safe);
            seen_safe.insert(safe_name.clone());

            params.push(Parameter {
                display_name,
                safe_name,
                values,
            });
        }

        if !params.iter().any(|p| p.cardinality() >= 2) {
            return Err(ModelError::NoCoverablePairs);
        }

        Ok(Self { params })
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn cardinalities(&self) -> Vec<usize> {
        self.params.iter().map(Parameter::cardinality).collect()
    }

    /// Declared index of the parameter carrying this safe name.
    pub fn index_of_safe_name(&self, safe: &str) -> Option<usize> {
        self.params.iter().position(|p| p.safe_name == safe)
    }

    /// Declared index of the parameter carrying this display name.
    pub fn index_of_display_name(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.display_name == name)
    }
}

/// Map a display name to a generator-safe token: runs of characters outside
/// `[A-Za-z0-9_]` collapse to a single `_`, leading digits/underscores are
/// stripped, and a numeric suffix keeps the result unique across the model.
/// Deterministic and idempotent.
fn derive_safe_name(display: &str, taken: &BTreeSet<String>) -> String {
    let mut token = String::with_capacity(display.len());
    let mut in_run = false;
    for ch in display.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            token.push(ch);
            in_run = false;
        } else if !in_run {
            token.push('_');
            in_run = true;
        }
    }
    let trimmed = token.trim_start_matches(|c: char| c.is_ascii_digit() || c == '_');
    let base = if trimmed.is_empty() {
        "p".to_string()
    } else {
        trimmed.to_string()
    };

    if !taken.contains(&base) {
        return base;
    }
    let mut n: u32 = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Permutation over parameter indices fed to the generator. The output of
/// the run is always re-projected back to the declared order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OrderingPlan {
    /// Identity permutation.
    Keep,
    /// Stable sort by cardinality descending, ties by original index.
    Auto,
}

impl OrderingPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderingPlan::Keep => "keep",
            OrderingPlan::Auto => "auto",
        }
    }

    /// `perm[k]` = declared index of the parameter in generator position `k`.
    pub fn permutation(&self, model: &Model) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..model.param_count()).collect();
        if let OrderingPlan::Auto = self {
            // sort_by_key is stable, so ties keep the original index order.
            idx.sort_by_key(|&i| std::cmp::Reverse(model.params()[i].cardinality()));
        }
        idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, values: &[&str]) -> ParamDecl {
        ParamDecl::new(name, values.iter().map(|v| v.to_string()).collect())
    }

    fn sample() -> Model {
        Model::new(vec![
            decl("OS", &["win", "mac", "linux"]),
            decl("Browser", &["ff", "chrome"]),
            decl("Arch", &["x64"]),
        ])
        .unwrap()
    }

    #[test]
    fn construction_canonicalizes_labels() {
        let m = Model::new(vec![
            decl(" OS ", &[" win ", "mac"]),
            decl("Browser", &["ff", "chrome"]),
        ])
        .unwrap();
        assert_eq!(m.params()[0].display_name(), "OS");
        assert_eq!(m.params()[0].values(), ["win", "mac"]);
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let m = sample();
        let again = Model::new(
            m.params()
                .iter()
                .map(|p| decl(p.display_name(), &p.values().iter().map(String::as_str).collect::<Vec<_>>()))
                .collect(),
        )
        .unwrap();
        assert_eq!(m, again);
    }

    #[test]
    fn rejects_fewer_than_two_parameters() {
        let err = Model::new(vec![decl("OS", &["win"])]).unwrap_err();
        assert_eq!(err, ModelError::TooFewParameters(1));
    }

    #[test]
    fn rejects_case_insensitive_duplicate_names() {
        let err = Model::new(vec![
            decl("OS", &["win", "mac"]),
            decl("os", &["a", "b"]),
        ])
        .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateDisplayName(_)));
    }

    #[test]
    fn rejects_duplicate_values_case_sensitive() {
        let err = Model::new(vec![
            decl("OS", &["win", "win"]),
            decl("Browser", &["ff", "chrome"]),
        ])
        .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateValue { .. }));
        // Different case is a different label.
        assert!(Model::new(vec![
            decl("OS", &["win", "Win"]),
            decl("Browser", &["ff", "chrome"]),
        ])
        .is_ok());
    }

    #[test]
    fn rejects_model_without_pairs() {
        let err = Model::new(vec![decl("A", &["x"]), decl("B", &["y"])]).unwrap_err();
        assert_eq!(err, ModelError::NoCoverablePairs);
    }

    #[test]
    fn safe_names_collapse_runs_and_trim_leading() {
        let m = Model::new(vec![
            decl("Operating System!", &["a", "b"]),
            decl("2nd Param", &["x", "y"]),
            decl("__lead", &["x", "y"]),
        ])
        .unwrap();
        assert_eq!(m.params()[0].safe_name(), "Operating_System_");
        assert_eq!(m.params()[1].safe_name(), "nd_Param");
        assert_eq!(m.params()[2].safe_name(), "lead");
    }

    #[test]
    fn safe_names_stay_unique_via_suffix() {
        let m = Model::new(vec![
            decl("a b", &["1", "2"]),
            decl("a-b", &["1", "2"]),
            decl("a.b", &["1", "2"]),
        ])
        .unwrap();
        assert_eq!(m.params()[0].safe_name(), "a_b");
        assert_eq!(m.params()[1].safe_name(), "a_b_2");
        assert_eq!(m.params()[2].safe_name(), "a_b_3");
    }

    #[test]
    fn safe_name_derivation_is_idempotent() {
        let taken = BTreeSet::new();
        let once = derive_safe_name("Operating System!", &taken);
        let twice = derive_safe_name(&once, &taken);
        assert_eq!(once, twice);
    }

    #[test]
    fn all_digit_name_falls_back() {
        let taken = BTreeSet::new();
        assert_eq!(derive_safe_name("123", &taken), "p");
    }

    #[test]
    fn keep_plan_is_identity() {
        let m = sample();
        assert_eq!(OrderingPlan::Keep.permutation(&m), vec![0, 1, 2]);
    }

    #[test]
    fn auto_plan_sorts_by_cardinality_desc_stable() {
        let m = Model::new(vec![
            ParamDecl::new("a", vec!["1".into(), "2".into()]),
            ParamDecl::new("b", vec!["1".into(), "2".into(), "3".into()]),
            ParamDecl::new("c", vec!["1".into(), "2".into()]),
        ])
        .unwrap();
        // b (3) first, then a and c (2 each) in declared order.
        assert_eq!(OrderingPlan::Auto.permutation(&m), vec![1, 0, 2]);
    }
}
