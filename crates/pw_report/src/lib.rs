//! pw_report — Pure offline renderers for the emitted suite.
//!
//! Determinism rules:
//! - No I/O here. Callers supply the model, the rows, and the metadata
//!   already in-memory, and own the stream the result goes to.
//! - Stable column and key order; structured output uses canonical JSON
//!   (recursively sorted object keys, single trailing LF).
//! - Rows are emitted in the order the generator produced them (no
//!   re-sort); columns follow the model's declared parameter order.

#![forbid(unsafe_code)]

use pw_core::Model;
use serde::Serialize;

/// The metadata block of the structured form. Field meanings follow the
/// output contract; `lb` is absent (null) whenever strength != 2.
#[derive(Clone, Debug, Serialize)]
pub struct Metadata {
    pub n: usize,
    pub lb: Option<u64>,
    pub verified: bool,
    pub ordering_mode: String,
    pub seed: u64,
    pub strength: u32,
    pub attempts: u32,
    pub early_stopped: bool,
    pub provably_minimum: bool,
}

impl Metadata {
    /// `provably_minimum` is derived, never set directly: a suite is
    /// provably minimum iff it verified and its size equals the bound.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        n: usize,
        lb: Option<u64>,
        verified: bool,
        ordering_mode: &str,
        seed: u64,
        strength: u32,
        attempts: u32,
        early_stopped: bool,
    ) -> Self {
        let provably_minimum = verified && lb == Some(n as u64);
        Self {
            n,
            lb,
            verified,
            ordering_mode: ordering_mode.to_string(),
            seed,
            strength,
            attempts,
            early_stopped,
            provably_minimum,
        }
    }
}

/// Everything the renderers need for one suite.
pub struct SuiteArtifact<'a> {
    pub model: &'a Model,
    pub rows: &'a [Vec<String>],
    pub meta: Metadata,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutputFormat {
    Table,
    Delim,
    Structured,
}

/// Render the artifact in the requested form. Always ends with a newline.
pub fn render(artifact: &SuiteArtifact<'_>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => render_table(artifact),
        OutputFormat::Delim => render_delim(artifact),
        OutputFormat::Structured => render_structured(artifact),
    }
}

// ===== Tabular =====

fn render_table(artifact: &SuiteArtifact<'_>) -> String {
    let headers: Vec<&str> = artifact
        .model
        .params()
        .iter()
        .map(|p| p.display_name())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in artifact.rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_padded_row(&mut out, &headers, &widths);
    let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let dash_refs: Vec<&str> = dashes.iter().map(String::as_str).collect();
    push_padded_row(&mut out, &dash_refs, &widths);
    for row in artifact.rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        push_padded_row(&mut out, &cells, &widths);
    }
    out
}

/// Two-space gutter; the last column is not padded (no trailing spaces).
fn push_padded_row(out: &mut String, cells: &[&str], widths: &[usize]) {
    let last = cells.len().saturating_sub(1);
    for (i, cell) in cells.iter().enumerate() {
        if i == last {
            out.push_str(cell);
        } else {
            out.push_str(cell);
            for _ in cell.chars().count()..widths[i] {
                out.push(' ');
            }
            out.push_str("  ");
        }
    }
    out.push('\n');
}

// ===== Delimited (RFC 4180) =====

fn render_delim(artifact: &SuiteArtifact<'_>) -> String {
    let mut out = String::new();
    let header: Vec<String> = artifact
        .model
        .params()
        .iter()
        .map(|p| csv_field(p.display_name()))
        .collect();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in artifact.rows {
        let cells: Vec<String> = row.iter().map(|c| csv_field(c)).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

/// Quote when the field contains the delimiter, the quote character, or a
/// line break; internal quotes are doubled.
fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        let mut quoted = String::with_capacity(s.len() + 2);
        quoted.push('"');
        for ch in s.chars() {
            if ch == '"' {
                quoted.push('"');
            }
            quoted.push(ch);
        }
        quoted.push('"');
        quoted
    } else {
        s.to_string()
    }
}

// ===== Structured (canonical JSON) =====

fn render_structured(artifact: &SuiteArtifact<'_>) -> String {
    let mut root = serde_json::Map::new();
    // Metadata serializes in struct order; canonicalization below makes the
    // byte layout independent of that anyway.
    let meta = serde_json::to_value(&artifact.meta)
        .unwrap_or(serde_json::Value::Null);
    root.insert("metadata".to_string(), meta);

    let cases: Vec<serde_json::Value> = artifact
        .rows
        .iter()
        .map(|row| {
            let mut obj = serde_json::Map::new();
            for (p, cell) in artifact.model.params().iter().zip(row) {
                obj.insert(
                    p.display_name().to_string(),
                    serde_json::Value::String(cell.clone()),
                );
            }
            serde_json::Value::Object(obj)
        })
        .collect();
    root.insert("test_cases".to_string(), serde_json::Value::Array(cases));

    let mut text = canonicalize_value(&serde_json::Value::Object(root)).to_string();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// Recursively sort object keys to guarantee deterministic serialization.
/// Arrays retain order; scalars pass through.
pub fn canonicalize_value(v: &serde_json::Value) -> serde_json::Value {
    match v {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                out.insert(k.clone(), canonicalize_value(&map[k]));
            }
            serde_json::Value::Object(out)
        }
        serde_json::Value::Array(a) => {
            serde_json::Value::Array(a.iter().map(canonicalize_value).collect())
        }
        _ => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_core::ParamDecl;

    fn artifact<'a>(model: &'a Model, rows: &'a [Vec<String>]) -> SuiteArtifact<'a> {
        SuiteArtifact {
            model,
            rows,
            meta: Metadata::new(rows.len(), Some(4), true, "auto", 0, 2, 1, false),
        }
    }

    fn model() -> Model {
        Model::new(vec![
            ParamDecl::new("OS", vec!["win".into(), "mac".into()]),
            ParamDecl::new("Browser", vec!["ff".into(), "chrome".into()]),
        ])
        .unwrap()
    }

    fn rows() -> Vec<Vec<String>> {
        vec![
            vec!["win".into(), "ff".into()],
            vec!["mac".into(), "chrome".into()],
        ]
    }

    #[test]
    fn table_pads_and_underlines() {
        let m = model();
        let r = rows();
        let text = render(&artifact(&m, &r), OutputFormat::Table);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "OS   Browser");
        assert_eq!(lines[1], "---  -------");
        assert_eq!(lines[2], "win  ff");
        assert_eq!(lines[3], "mac  chrome");
    }

    #[test]
    fn delim_quotes_only_when_needed() {
        let m = Model::new(vec![
            ParamDecl::new("A", vec!["x,y".into(), "plain".into()]),
            ParamDecl::new("B", vec!["say \"hi\"".into(), "b".into()]),
        ])
        .unwrap();
        let r = vec![
            vec!["x,y".to_string(), "say \"hi\"".to_string()],
            vec!["plain".to_string(), "b".to_string()],
        ];
        let text = render(&artifact(&m, &r), OutputFormat::Delim);
        assert_eq!(
            text,
            "A,B\n\"x,y\",\"say \"\"hi\"\"\"\nplain,b\n"
        );
    }

    #[test]
    fn structured_holds_metadata_and_cases() {
        let m = model();
        let r = rows();
        let text = render(&artifact(&m, &r), OutputFormat::Structured);
        assert!(text.ends_with('\n'));
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["metadata"]["n"], 2);
        assert_eq!(v["metadata"]["lb"], 4);
        assert_eq!(v["metadata"]["verified"], true);
        assert_eq!(v["metadata"]["provably_minimum"], false);
        assert_eq!(v["test_cases"][0]["OS"], "win");
        assert_eq!(v["test_cases"][1]["Browser"], "chrome");
    }

    #[test]
    fn structured_lb_null_at_other_strengths() {
        let m = model();
        let r = rows();
        let mut a = artifact(&m, &r);
        a.meta = Metadata::new(2, None, false, "keep", 9, 3, 5, false);
        let text = render(&a, OutputFormat::Structured);
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(v["metadata"]["lb"].is_null());
        assert_eq!(v["metadata"]["provably_minimum"], false);
    }

    #[test]
    fn provably_minimum_requires_verified_and_bound_match() {
        assert!(Metadata::new(4, Some(4), true, "auto", 0, 2, 1, false).provably_minimum);
        assert!(!Metadata::new(5, Some(4), true, "auto", 0, 2, 1, false).provably_minimum);
        assert!(!Metadata::new(4, Some(4), false, "auto", 0, 2, 1, false).provably_minimum);
        assert!(!Metadata::new(4, None, true, "auto", 0, 2, 1, false).provably_minimum);
    }

    #[test]
    fn rendering_is_deterministic() {
        let m = model();
        let r = rows();
        for fmt in [OutputFormat::Table, OutputFormat::Delim, OutputFormat::Structured] {
            assert_eq!(render(&artifact(&m, &r), fmt), render(&artifact(&m, &r), fmt));
        }
    }
}
