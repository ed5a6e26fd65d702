// crates/pw_cli/src/main.rs
//
// pw — CLI entrypoint.
// Drives the optimization pipeline end-to-end and maps run outcomes to the
// stable exit-code contract. Strictly offline & deterministic apart from
// the external generator child process.
//
// Stream contract: stdout carries only the artifact (suite in the chosen
// form); warnings, progress, and errors go to stderr with a "pw:" prefix.

mod args;
mod wizard;

use std::fs;
use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use args::{Cli, Command, DoctorArgs, GenerateArgs, VerifyArgs};
use pw_algo::{check_pairwise, Defect};
use pw_core::{Model, OrderingPlan};
use pw_io::suite::{parse_suite_file, SuiteDialect};
use pw_io::{parse_model_bytes, parse_model_str, GenOutcome, PictRunner};
use pw_pipeline::{optimize, AttemptOutcome, RunOptions, RunResult, Verdict};
use pw_report::{render, Metadata, OutputFormat, SuiteArtifact};

// Stable exit-code contract.
pub(crate) const EXIT_OK: u8 = 0;
pub(crate) const EXIT_INPUT: u8 = 2;
pub(crate) const EXIT_GENERATOR: u8 = 3;
pub(crate) const EXIT_VERIFY: u8 = 4;
pub(crate) const EXIT_TIMEOUT: u8 = 5;

const ENV_PICT_BIN: &str = "PW_PICT_BIN";

#[cfg(windows)]
const PICT_EXE: &str = "pict.exe";
#[cfg(not(windows))]
const PICT_EXE: &str = "pict";

fn main() -> ExitCode {
    // Single clean-exit barrier: unexpected faults become one stable line
    // on the diagnostic stream, never a backtrace across the contract.
    std::panic::set_hook(Box::new(|_| {}));
    match std::panic::catch_unwind(run) {
        Ok(code) => ExitCode::from(code),
        Err(_) => {
            eprintln!("pw: error: internal invariant violation");
            ExitCode::from(EXIT_GENERATOR)
        }
    }
}

fn run() -> u8 {
    match Cli::parse().command {
        Command::Generate(a) => generate_cmd(a),
        Command::Verify(a) => verify_cmd(a),
        Command::Doctor(a) => doctor_cmd(a),
        Command::Version => {
            println!("pw {}", env!("CARGO_PKG_VERSION"));
            EXIT_OK
        }
        Command::Licenses => {
            print!("{LICENSES}");
            EXIT_OK
        }
        Command::Wizard(a) => wizard::run(a),
    }
}

// ----------------------------- generate -----------------------------

fn generate_cmd(a: GenerateArgs) -> u8 {
    let opts = match a.to_run_options() {
        Ok(o) => o,
        Err(msg) => return input_error(&msg),
    };
    if let Err(e) = opts.validate() {
        return input_error(&e.to_string());
    }
    let model = match load_model(&a.model) {
        Ok(m) => m,
        Err(msg) => return input_error(&msg),
    };
    let bin = match resolve_generator(a.pict_bin.as_deref()) {
        Ok(b) => b,
        Err(msg) => return input_error(&msg),
    };
    execute_generate(
        &model,
        &opts,
        &PictRunner::new(bin),
        a.output_format(),
        a.out.as_deref(),
        a.verbose,
    )
}

/// Shared by `generate` and the wizard: run the driver, then emit or map
/// the failure to an exit code.
pub(crate) fn execute_generate(
    model: &Model,
    opts: &RunOptions,
    runner: &PictRunner,
    format: OutputFormat,
    out: Option<&Path>,
    verbose: bool,
) -> u8 {
    for w in opts.warnings() {
        eprintln!("pw: warning: {w}");
    }

    let result = match optimize(model, opts, runner, |att| {
        if verbose {
            eprintln!(
                "pw: attempt {} seed {}: {} ({} ms)",
                att.index + 1,
                att.seed,
                describe_outcome(&att.outcome),
                att.wall.as_millis()
            );
        }
    }) {
        Ok(r) => r,
        Err(e) => return input_error(&e.to_string()),
    };

    match result.verdict() {
        Verdict::Success => emit_success(model, &result, format, out),
        Verdict::VerificationFailed { attempt } => {
            report_unverified(&result, attempt);
            EXIT_VERIFY
        }
        Verdict::TimedOut => {
            eprintln!(
                "pw: error: no suite produced within the wall-clock budget \
                 ({} attempt(s) consumed)",
                result.attempts_consumed()
            );
            EXIT_TIMEOUT
        }
        Verdict::GeneratorFailed { attempt } => {
            match &result.attempts[attempt].outcome {
                AttemptOutcome::GeneratorError { detail } => {
                    eprintln!("pw: error: {detail}");
                }
                _ => eprintln!("pw: error: generator failed"),
            }
            EXIT_GENERATOR
        }
    }
}

fn describe_outcome(outcome: &AttemptOutcome) -> String {
    match outcome {
        AttemptOutcome::Verified { rows } => format!("verified n={}", rows.len()),
        AttemptOutcome::Suite { rows } => format!("suite n={} (unchecked)", rows.len()),
        AttemptOutcome::Unverified { rows, .. } => format!("unverified n={}", rows.len()),
        AttemptOutcome::Timeout => "timeout".to_string(),
        AttemptOutcome::GeneratorError { .. } => "generator error".to_string(),
    }
}

fn emit_success(model: &Model, result: &RunResult, format: OutputFormat, out: Option<&Path>) -> u8 {
    let (rows, seed) = match result.best_attempt().and_then(|a| a.outcome.rows().map(|r| (r, a.seed))) {
        Some(pair) => pair,
        None => {
            eprintln!("pw: error: internal invariant violation");
            return EXIT_GENERATOR;
        }
    };
    let meta = Metadata::new(
        rows.len(),
        result.lb,
        result.best_is_verified(),
        result.ordering.as_str(),
        seed,
        result.strength,
        result.attempts_consumed(),
        result.early_stopped,
    );
    let text = render(&SuiteArtifact { model, rows, meta }, format);
    match out {
        Some(path) => {
            if let Err(e) = fs::write(path, text) {
                return input_error(&format!("cannot write {}: {e}", path.display()));
            }
            EXIT_OK
        }
        None => {
            print!("{text}");
            EXIT_OK
        }
    }
}

fn report_unverified(result: &RunResult, attempt: usize) {
    let att = &result.attempts[attempt];
    eprintln!(
        "pw: error: no suite survived verification; smallest candidate \
         (seed {}, n={}) is incomplete",
        att.seed,
        att.outcome.n().unwrap_or(0)
    );
    if let AttemptOutcome::Unverified { report, .. } = &att.outcome {
        print_defects(&report.defects);
    }
}

fn print_defects(defects: &[Defect]) {
    for defect in defects {
        match defect {
            Defect::MissingPairs { shown, total } => {
                eprintln!("pw: error: {total} uncovered pair(s); first {}:", shown.len());
                for mp in shown {
                    eprintln!("pw: error:   missing {mp}");
                }
            }
            other => eprintln!("pw: error: {other}"),
        }
    }
}

// ----------------------------- verify -----------------------------

fn verify_cmd(a: VerifyArgs) -> u8 {
    let model = match load_model(&a.model) {
        Ok(m) => m,
        Err(msg) => return input_error(&msg),
    };
    let bytes = match fs::read(&a.suite) {
        Ok(b) => b,
        Err(e) => return input_error(&format!("cannot read {}: {e}", a.suite.display())),
    };
    let text = match String::from_utf8(bytes) {
        Ok(t) => t,
        Err(e) => return input_error(&format!("suite is not valid UTF-8: {e}")),
    };

    let dialect = match a.delim.as_deref() {
        Some("comma") => SuiteDialect::Comma,
        Some(_) => SuiteDialect::Tab,
        None => match a.suite.extension().and_then(|e| e.to_str()) {
            Some("csv") => SuiteDialect::Comma,
            _ => SuiteDialect::Tab,
        },
    };

    let rows = match parse_suite_file(&model, &text, dialect) {
        Ok(r) => r,
        Err(e) => return input_error(&e.to_string()),
    };

    let report = check_pairwise(&model, &rows);
    if report.passed() {
        println!(
            "pw: verified: {} row(s) cover all {} required pair(s)",
            report.rows, report.required_pairs
        );
        EXIT_OK
    } else {
        eprintln!("pw: error: suite fails verification");
        print_defects(&report.defects);
        EXIT_VERIFY
    }
}

// ----------------------------- doctor -----------------------------

fn doctor_cmd(a: DoctorArgs) -> u8 {
    let bin = match resolve_generator(a.pict_bin.as_deref()) {
        Ok(b) => b,
        Err(msg) => return input_error(&msg),
    };
    println!("pw: generator binary: {}", bin.display());

    let model = match parse_model_str("a: 0, 1\nb: 0, 1\n") {
        Ok(m) => m,
        Err(_) => {
            eprintln!("pw: error: internal invariant violation");
            return EXIT_GENERATOR;
        }
    };
    let runner = PictRunner::new(bin);
    match runner.run(&model, OrderingPlan::Keep, 0, 2, Duration::from_secs(10)) {
        GenOutcome::Rows(rows) => {
            let report = check_pairwise(&model, &rows);
            if report.passed() {
                println!("pw: probe suite: {} row(s), coverage complete", rows.len());
                EXIT_OK
            } else {
                eprintln!("pw: error: probe suite does not cover the probe model");
                EXIT_GENERATOR
            }
        }
        GenOutcome::Timeout => {
            eprintln!("pw: error: probe run timed out");
            EXIT_TIMEOUT
        }
        GenOutcome::Failed { detail } => {
            eprintln!("pw: error: probe run failed: {detail}");
            EXIT_GENERATOR
        }
    }
}

// ----------------------------- shared helpers -----------------------------

fn input_error(msg: &str) -> u8 {
    eprintln!("pw: error: {msg}");
    EXIT_INPUT
}

/// Read and parse a model source; '-' reads stdin.
pub(crate) fn load_model(path: &Path) -> Result<Model, String> {
    let bytes = if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| format!("cannot read stdin: {e}"))?;
        buf
    } else {
        fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?
    };
    parse_model_bytes(&bytes).map_err(|e| e.to_string())
}

/// Resolve the external generator binary: explicit flag, then the
/// environment override, then PATH. The resolved path is passed into the
/// driver and read-only afterwards.
pub(crate) fn resolve_generator(flag: Option<&Path>) -> Result<PathBuf, String> {
    if let Some(p) = flag {
        return if p.is_file() {
            Ok(p.to_path_buf())
        } else {
            Err(format!("generator binary not found: {}", p.display()))
        };
    }
    if let Some(env_path) = std::env::var_os(ENV_PICT_BIN) {
        let p = PathBuf::from(env_path);
        return if p.is_file() {
            Ok(p)
        } else {
            Err(format!(
                "{ENV_PICT_BIN} points at a missing file: {}",
                p.display()
            ))
        };
    }
    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            let candidate = dir.join(PICT_EXE);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    Err(format!(
        "generator binary not found; pass --pict-bin or set {ENV_PICT_BIN}"
    ))
}

const LICENSES: &str = "\
pw is licensed under Apache-2.0 OR MIT.

Third-party crates linked into this binary:
  clap         Apache-2.0 OR MIT
  serde        Apache-2.0 OR MIT
  serde_json   Apache-2.0 OR MIT
  thiserror    Apache-2.0 OR MIT
  rand_core    Apache-2.0 OR MIT
  rand_chacha  Apache-2.0 OR MIT
  tempfile     Apache-2.0 OR MIT

Microsoft PICT is invoked as a separate executable and is licensed
separately (MIT); it is not linked into this binary.
";
