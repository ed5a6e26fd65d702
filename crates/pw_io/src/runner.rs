// crates/pw_io/src/runner.rs
//
// Child-process adapter for the external pairwise generator (PICT).
//
// Contract with the caller (the optimization driver):
// - the model is serialized in generator-side order to a temp file that is
//   removed on every exit path (drop of `NamedTempFile`);
// - the seed goes through `/r:SEED`, strength through `/o:N` when not 2;
// - stdout/stderr are drained on reader threads so a large suite cannot
//   deadlock the pipe;
// - wall time past the deadline gets a short grace window of further
//   polling, then the child is killed and reaped; a timeout never returns
//   partial rows;
// - non-zero exit or empty stdout is a generator error carrying a bounded
//   stderr tail.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use pw_core::{Model, OrderingPlan};

use crate::model_text::serialize_model_ordered;
use crate::suite::parse_generator_tsv;

/// Grace window between the deadline and force-kill.
const KILL_GRACE: Duration = Duration::from_millis(200);

/// Poll interval while waiting on the child.
const WAIT_POLL: Duration = Duration::from_millis(10);

/// Bound on the stderr tail attached to generator errors.
const STDERR_TAIL_BYTES: usize = 2048;

/// One generator execution's result. Spawn failures, bad exits, and
/// malformed captures all collapse into `Failed`; the driver records the
/// detail and moves on to the next seed.
#[derive(Clone, Debug)]
pub enum GenOutcome {
    Rows(Vec<Vec<String>>),
    Timeout,
    Failed { detail: String },
}

/// Handle on a resolved generator binary. The path is resolved once by the
/// caller and read-only afterwards.
#[derive(Clone, Debug)]
pub struct PictRunner {
    bin: PathBuf,
}

impl PictRunner {
    pub fn new(bin: PathBuf) -> Self {
        Self { bin }
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    /// Run one attempt: serialize the model per the ordering plan, invoke
    /// the generator, capture and re-project its TSV into declared order.
    pub fn run(
        &self,
        model: &Model,
        plan: OrderingPlan,
        seed: u64,
        strength: u32,
        timeout: Duration,
    ) -> GenOutcome {
        let perm = plan.permutation(model);
        let text = serialize_model_ordered(model, &perm);

        let mut tmp = match tempfile::NamedTempFile::new() {
            Ok(t) => t,
            Err(e) => {
                return GenOutcome::Failed {
                    detail: format!("cannot create temp model file: {e}"),
                }
            }
        };
        if let Err(e) = tmp.write_all(text.as_bytes()).and_then(|_| tmp.flush()) {
            return GenOutcome::Failed {
                detail: format!("cannot write temp model file: {e}"),
            };
        }

        let mut cmd = Command::new(&self.bin);
        cmd.arg(tmp.path());
        if strength != 2 {
            cmd.arg(format!("/o:{strength}"));
        }
        cmd.arg(format!("/r:{seed}"));
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                return GenOutcome::Failed {
                    detail: format!("cannot spawn {}: {e}", self.bin.display()),
                }
            }
        };

        let stdout_rx = drain(child.stdout.take());
        let stderr_rx = drain(child.stderr.take());

        let deadline = Instant::now() + timeout;
        let status = match wait_deadline(&mut child, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => {
                // Grace window, then force-kill and reap.
                match wait_deadline(&mut child, Instant::now() + KILL_GRACE) {
                    Ok(Some(_)) | Ok(None) | Err(_) => {}
                }
                let _ = child.kill();
                let _ = child.wait();
                return GenOutcome::Timeout;
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return GenOutcome::Failed {
                    detail: format!("wait on generator failed: {e}"),
                };
            }
        };

        let stdout = join_drained(stdout_rx);
        let stderr = join_drained(stderr_rx);

        if !status.success() {
            return GenOutcome::Failed {
                detail: format!(
                    "generator exited with {}: {}",
                    status,
                    stderr_tail(&stderr)
                ),
            };
        }

        let stdout_text = match String::from_utf8(stdout) {
            Ok(s) => s,
            Err(e) => {
                return GenOutcome::Failed {
                    detail: format!("generator stdout is not UTF-8: {e}"),
                }
            }
        };
        if stdout_text.trim().is_empty() {
            return GenOutcome::Failed {
                detail: format!(
                    "generator exited 0 with empty output: {}",
                    stderr_tail(&stderr)
                ),
            };
        }

        match parse_generator_tsv(model, &stdout_text) {
            Ok(rows) => GenOutcome::Rows(rows),
            Err(e) => GenOutcome::Failed {
                detail: e.to_string(),
            },
        }
    }
}

/// Drain a pipe on its own thread; `None` pipes yield empty output.
fn drain<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn join_drained(handle: std::thread::JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

/// Poll `try_wait` until exit or deadline. Returns `Ok(None)` on deadline.
fn wait_deadline(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(WAIT_POLL);
    }
}

/// Last ~2 KiB of stderr as lossy text, trimmed.
fn stderr_tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(STDERR_TAIL_BYTES);
    let tail = String::from_utf8_lossy(&bytes[start..]);
    let tail = tail.trim();
    if tail.is_empty() {
        "(no stderr)".to_string()
    } else {
        tail.to_string()
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use pw_core::ParamDecl;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn model() -> Model {
        Model::new(vec![
            ParamDecl::new("A", vec!["a1".into(), "a2".into()]),
            ParamDecl::new("B", vec!["b1".into(), "b2".into()]),
        ])
        .unwrap()
    }

    /// Write an executable fake-generator script and return its runner.
    fn fake(dir: &tempfile::TempDir, body: &str) -> PictRunner {
        let path = dir.path().join("fake-pict");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        PictRunner::new(path)
    }

    const FULL_TSV: &str =
        r#"printf 'A\tB\na1\tb1\na1\tb2\na2\tb1\na2\tb2\n'"#;

    #[test]
    fn captures_and_projects_rows() {
        let dir = tempfile::tempdir().unwrap();
        let runner = fake(&dir, FULL_TSV);
        match runner.run(&model(), OrderingPlan::Keep, 0, 2, Duration::from_secs(5)) {
            GenOutcome::Rows(rows) => {
                assert_eq!(rows.len(), 4);
                assert_eq!(rows[0], vec!["a1", "b1"]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn reordered_header_comes_back_in_declared_order() {
        let dir = tempfile::tempdir().unwrap();
        let runner = fake(&dir, r#"printf 'B\tA\nb1\ta2\n'"#);
        match runner.run(&model(), OrderingPlan::Auto, 1, 2, Duration::from_secs(5)) {
            GenOutcome::Rows(rows) => assert_eq!(rows, vec![vec!["a2", "b1"]]),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn nonzero_exit_carries_stderr_tail() {
        let dir = tempfile::tempdir().unwrap();
        let runner = fake(&dir, "echo boom >&2; exit 3");
        match runner.run(&model(), OrderingPlan::Keep, 0, 2, Duration::from_secs(5)) {
            GenOutcome::Failed { detail } => assert!(detail.contains("boom"), "{detail}"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn clean_exit_with_empty_stdout_is_a_contract_violation() {
        let dir = tempfile::tempdir().unwrap();
        let runner = fake(&dir, "exit 0");
        match runner.run(&model(), OrderingPlan::Keep, 0, 2, Duration::from_secs(5)) {
            GenOutcome::Failed { detail } => assert!(detail.contains("empty output")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn deadline_kills_and_reports_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let runner = fake(&dir, "sleep 30");
        let started = Instant::now();
        match runner.run(&model(), OrderingPlan::Keep, 0, 2, Duration::from_millis(100)) {
            GenOutcome::Timeout => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn missing_binary_fails_cleanly() {
        let runner = PictRunner::new(PathBuf::from("/nonexistent/pict-binary"));
        match runner.run(&model(), OrderingPlan::Keep, 0, 2, Duration::from_secs(1)) {
            GenOutcome::Failed { detail } => assert!(detail.contains("spawn")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn model_file_reaches_the_generator() {
        let dir = tempfile::tempdir().unwrap();
        // Echo the model file back as stderr and fail, so we can observe it.
        let runner = fake(&dir, "cat \"$1\" >&2; exit 1");
        match runner.run(&model(), OrderingPlan::Keep, 7, 2, Duration::from_secs(5)) {
            GenOutcome::Failed { detail } => {
                assert!(detail.contains("A: a1, a2"), "{detail}");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
