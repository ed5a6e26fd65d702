// crates/pw_io/src/suite.rs
//
// Suite parsing in two flavors:
//
// - `parse_generator_tsv`: the external generator's stdout capture. Header
//   row of safe names (any column order), tab-separated rows. The rows are
//   re-projected into the model's declared parameter order here, so ordering
//   plans never leak into what callers see.
// - `parse_suite_file`: a delimited suite handed to the `verify` surface.
//   Header cells may be display names or safe names; comma dialect gets
//   RFC-4180 quoting, tab dialect is plain splitting.
//
// Both tolerate a leading UTF-8 BOM and CRLF endings. Cells are trimmed of
// surrounding whitespace only.

use pw_core::Model;

use crate::{IoError, IoResult};

/// Parse the generator's TSV capture and re-project rows into declared
/// parameter order.
pub fn parse_generator_tsv(model: &Model, text: &str) -> IoResult<Vec<Vec<String>>> {
    let mut lines = logical_lines(text);
    let header = lines.next().ok_or_else(|| IoError::Capture("no header row".into()))?;
    let cols: Vec<&str> = header.split('\t').map(str::trim).collect();

    let projection = project_header(model, &cols, false).map_err(IoError::Capture)?;

    let mut rows = Vec::new();
    for (lineno, line) in lines.enumerate() {
        let cells: Vec<&str> = line.split('\t').map(str::trim).collect();
        if cells.len() != cols.len() {
            return Err(IoError::Capture(format!(
                "row {}: expected {} columns, found {}",
                lineno + 1,
                cols.len(),
                cells.len()
            )));
        }
        let mut row = vec![String::new(); model.param_count()];
        for (col, cell) in cells.iter().enumerate() {
            row[projection[col]] = cell.to_string();
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Delimiter dialect for suite files.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SuiteDialect {
    Tab,
    Comma,
}

/// Parse a suite file for independent verification. Returns rows in
/// declared parameter order.
pub fn parse_suite_file(model: &Model, text: &str, dialect: SuiteDialect) -> IoResult<Vec<Vec<String>>> {
    let records = match dialect {
        SuiteDialect::Tab => logical_lines(text)
            .map(|l| l.split('\t').map(|c| c.trim().to_string()).collect())
            .collect::<Vec<Vec<String>>>(),
        SuiteDialect::Comma => parse_rfc4180(strip_bom(text))?,
    };

    let mut it = records.into_iter();
    let header = it.next().ok_or_else(|| IoError::Suite("no header row".into()))?;
    let cols: Vec<&str> = header.iter().map(|c| c.trim()).collect();
    let projection = project_header(model, &cols, true).map_err(IoError::Suite)?;

    let mut rows = Vec::new();
    for (lineno, cells) in it.enumerate() {
        if cells.len() != cols.len() {
            return Err(IoError::Suite(format!(
                "row {}: expected {} columns, found {}",
                lineno + 1,
                cols.len(),
                cells.len()
            )));
        }
        let mut row = vec![String::new(); model.param_count()];
        for (col, cell) in cells.iter().enumerate() {
            row[projection[col]] = cell.trim().to_string();
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Map header columns to declared parameter indices. Every model parameter
/// must appear exactly once; anything else is a contract violation.
fn project_header(
    model: &Model,
    cols: &[&str],
    accept_display: bool,
) -> Result<Vec<usize>, String> {
    if cols.len() != model.param_count() {
        return Err(format!(
            "header has {} columns, model declares {} parameters",
            cols.len(),
            model.param_count()
        ));
    }
    let mut projection = Vec::with_capacity(cols.len());
    let mut taken = vec![false; model.param_count()];
    for col in cols {
        let idx = model
            .index_of_safe_name(col)
            .or_else(|| accept_display.then(|| model.index_of_display_name(col)).flatten())
            .ok_or_else(|| format!("unknown column {col}"))?;
        if taken[idx] {
            return Err(format!("duplicate column {col}"));
        }
        taken[idx] = true;
        projection.push(idx);
    }
    Ok(projection)
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Non-empty lines with BOM and CR stripped.
fn logical_lines(text: &str) -> impl Iterator<Item = &str> {
    strip_bom(text)
        .lines()
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.trim().is_empty())
}

/// Minimal RFC-4180 reader: comma-separated, `"`-quoted fields with doubled
/// internal quotes; quoted fields may span lines. Good enough to read back
/// what the delimited emitter writes.
fn parse_rfc4180(text: &str) -> IoResult<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' if field.is_empty() => in_quotes = true,
            '"' => return Err(IoError::Suite("stray quote inside unquoted field".into())),
            ',' => {
                record.push(std::mem::take(&mut field));
                // trailing comma at end of input yields an empty final field
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(ch),
        }
    }
    if in_quotes {
        return Err(IoError::Suite("unterminated quoted field".into()));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    // Drop blank records (trailing newlines).
    records.retain(|r| !(r.len() == 1 && r[0].trim().is_empty()));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_core::ParamDecl;

    fn model() -> Model {
        Model::new(vec![
            ParamDecl::new("OS", vec!["win".into(), "mac".into()]),
            ParamDecl::new("Browser", vec!["ff".into(), "chrome".into()]),
        ])
        .unwrap()
    }

    #[test]
    fn tsv_rows_land_in_declared_order() {
        let m = model();
        // Generator emitted columns in the reverse order.
        let text = "Browser\tOS\nff\twin\nchrome\tmac\n";
        let rows = parse_generator_tsv(&m, text).unwrap();
        assert_eq!(rows, vec![vec!["win", "ff"], vec!["mac", "chrome"]]);
    }

    #[test]
    fn tsv_tolerates_bom_and_crlf() {
        let m = model();
        let text = "\u{feff}OS\tBrowser\r\nwin\tff\r\n";
        let rows = parse_generator_tsv(&m, text).unwrap();
        assert_eq!(rows, vec![vec!["win", "ff"]]);
    }

    #[test]
    fn tsv_unknown_column_is_rejected() {
        let err = parse_generator_tsv(&model(), "OS\tNope\nwin\tff\n").unwrap_err();
        assert!(matches!(err, IoError::Capture(ref m) if m.contains("unknown column")));
    }

    #[test]
    fn tsv_duplicate_and_missing_columns_are_rejected() {
        assert!(parse_generator_tsv(&model(), "OS\tOS\nwin\twin\n").is_err());
        assert!(parse_generator_tsv(&model(), "OS\nwin\n").is_err());
    }

    #[test]
    fn tsv_row_width_mismatch_is_rejected() {
        let err = parse_generator_tsv(&model(), "OS\tBrowser\nwin\n").unwrap_err();
        assert!(matches!(err, IoError::Capture(ref m) if m.contains("columns")));
    }

    #[test]
    fn suite_file_accepts_display_name_header() {
        let m = model();
        let rows = parse_suite_file(&m, "OS,Browser\nwin,ff\n", SuiteDialect::Comma).unwrap();
        assert_eq!(rows, vec![vec!["win", "ff"]]);
    }

    #[test]
    fn rfc4180_quoting_round_trips() {
        let m = Model::new(vec![
            ParamDecl::new("A", vec!["x,y".into(), "plain".into()]),
            ParamDecl::new("B", vec!["say \"hi\"".into(), "b".into()]),
        ])
        .unwrap();
        let text = "A,B\n\"x,y\",\"say \"\"hi\"\"\"\nplain,b\n";
        let rows = parse_suite_file(&m, text, SuiteDialect::Comma).unwrap();
        assert_eq!(
            rows,
            vec![vec!["x,y", "say \"hi\""], vec!["plain", "b"]]
        );
    }

    #[test]
    fn rfc4180_rejects_unterminated_quote() {
        let err = parse_suite_file(&model(), "OS,Browser\n\"win,ff\n", SuiteDialect::Comma)
            .unwrap_err();
        assert!(matches!(err, IoError::Suite(_)));
    }
}
