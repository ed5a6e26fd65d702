// crates/pw_io/src/model_text.rs
//
// Line-oriented model source: `NAME : V1, V2, ...` per declaration,
// `#` line comments, blank lines ignored. A leading UTF-8 BOM and CRLF
// line endings are tolerated. Per-line shape errors carry 1-based line
// numbers; cross-cutting invariants (duplicate names, no coverable pair)
// are enforced by `Model::new`.

use pw_core::{Model, ParamDecl};

use crate::{IoError, IoResult};

/// Decode bytes as UTF-8 (stripping a BOM if present) and parse.
pub fn parse_model_bytes(bytes: &[u8]) -> IoResult<Model> {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)
        .map_err(|e| IoError::Utf8(format!("model source: {e}")))?;
    parse_model_str(text)
}

/// Parse model text into a validated `Model`.
pub fn parse_model_str(text: &str) -> IoResult<Model> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut decls: Vec<ParamDecl> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.strip_suffix('\r').unwrap_or(raw).trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (name, rest) = line.split_once(':').ok_or_else(|| IoError::ModelText {
            line: lineno,
            msg: "missing ':' separator".into(),
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(IoError::ModelText {
                line: lineno,
                msg: "empty parameter name".into(),
            });
        }
        if rest.trim().is_empty() {
            return Err(IoError::ModelText {
                line: lineno,
                msg: format!("parameter {name} declares no values"),
            });
        }

        let mut values = Vec::new();
        for field in rest.split(',') {
            let label = field.trim();
            if label.is_empty() {
                return Err(IoError::ModelText {
                    line: lineno,
                    msg: format!("parameter {name} has an empty value field"),
                });
            }
            values.push(label.to_string());
        }
        decls.push(ParamDecl::new(name, values));
    }

    Ok(Model::new(decls)?)
}

/// Serialize back to the textual form: safe names on the left, stripped
/// value labels on the right, comma+space separated, LF line endings.
pub fn serialize_model(model: &Model) -> String {
    let perm: Vec<usize> = (0..model.param_count()).collect();
    serialize_model_ordered(model, &perm)
}

/// Serialization with an explicit parameter permutation (the generator-side
/// order chosen by the ordering plan).
pub fn serialize_model_ordered(model: &Model, perm: &[usize]) -> String {
    let mut out = String::new();
    for &i in perm {
        let p = &model.params()[i];
        out.push_str(p.safe_name());
        out.push_str(": ");
        out.push_str(&p.values().join(", "));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_core::OrderingPlan;

    const SOURCE: &str = "\
# platforms under test
OS: win, mac, linux

Browser : ff, chrome
";

    #[test]
    fn parses_comments_blanks_and_whitespace() {
        let m = parse_model_str(SOURCE).unwrap();
        assert_eq!(m.param_count(), 2);
        assert_eq!(m.params()[0].display_name(), "OS");
        assert_eq!(m.params()[0].values(), ["win", "mac", "linux"]);
        assert_eq!(m.params()[1].display_name(), "Browser");
    }

    #[test]
    fn tolerates_bom_and_crlf() {
        let src = "\u{feff}OS: win, mac\r\nBrowser: ff, chrome\r\n";
        let m = parse_model_str(src).unwrap();
        assert_eq!(m.param_count(), 2);
        let bytes = format!("\u{feff}{SOURCE}").into_bytes();
        assert!(parse_model_bytes(&bytes).is_ok());
    }

    #[test]
    fn non_utf8_is_a_validation_error() {
        let err = parse_model_bytes(&[0x4f, 0x53, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, IoError::Utf8(_)));
    }

    #[test]
    fn missing_separator_names_the_line() {
        let err = parse_model_str("OS: a, b\nBrowser ff chrome\n").unwrap_err();
        match err {
            IoError::ModelText { line, msg } => {
                assert_eq!(line, 2);
                assert!(msg.contains("separator"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_name_and_empty_field_are_rejected() {
        assert!(matches!(
            parse_model_str(" : a, b\n").unwrap_err(),
            IoError::ModelText { line: 1, .. }
        ));
        assert!(matches!(
            parse_model_str("OS: a, , b\nB: x, y\n").unwrap_err(),
            IoError::ModelText { line: 1, .. }
        ));
        assert!(matches!(
            parse_model_str("OS:\nB: x, y\n").unwrap_err(),
            IoError::ModelText { line: 1, .. }
        ));
    }

    #[test]
    fn round_trip_preserves_structure() {
        let m = parse_model_str(SOURCE).unwrap();
        let again = parse_model_str(&serialize_model(&m)).unwrap();
        assert_eq!(again.param_count(), m.param_count());
        for (a, b) in m.params().iter().zip(again.params()) {
            // Display names travel as safe names on the wire.
            assert_eq!(b.display_name(), a.safe_name());
            assert_eq!(b.values(), a.values());
        }
    }

    #[test]
    fn ordered_serialization_follows_the_permutation() {
        let m = parse_model_str("A: 1, 2\nB: 1, 2, 3\n").unwrap();
        let perm = OrderingPlan::Auto.permutation(&m);
        let text = serialize_model_ordered(&m, &perm);
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("B:"));
    }
}
