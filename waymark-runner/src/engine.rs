//! Execution engine: run one migration's entry point and record the outcome.
//!
//! ## `Engine::run` protocol
//!
//! 1. Resolve exactly one `migrate*` file in `<migrations_dir>/<id>`.
//! 2. Spawn it with the environment name as its only argument, the migration
//!    directory as working directory, and the config pairs merged into the
//!    inherited environment.
//! 3. Relay stdout and stderr line by line to the console while the child
//!    runs, keeping the combined transcript in arrival order.
//! 4. On exit of the script itself: code 0 → `DONE`, anything else →
//!    `FAILED`. Output still queued is drained for a short grace period; a
//!    background process holding the pipes is not waited for.
//! 5. Persist the status, then return the [`Outcome`].

use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use waymark_core::{
    check_transition, layout, MigrationId, Settings, Status, Trigger,
};

use crate::error::{io_err, RunError};

/// What happened when a migration ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub id: MigrationId,
    /// `Done` or `Failed`, as persisted.
    pub status: Status,
    /// `None` when the child was killed by a signal.
    pub exit_code: Option<i32>,
    /// Combined stdout/stderr.
    pub output: String,
}

impl Outcome {
    pub fn succeeded(&self) -> bool {
        self.status == Status::Done
    }
}

/// Runs migrations of one migrations root.
#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    settings: &'a Settings,
}

impl<'a> Engine<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    /// The single `migrate*` file of a migration.
    pub fn entry_point(&self, id: &MigrationId) -> Result<PathBuf, RunError> {
        let dir = self.settings.migration_dir(id);
        if !dir.is_dir() {
            return Err(RunError::MissingDirectory {
                id: id.clone(),
                path: dir,
            });
        }
        let mut candidates = layout::entry_point_candidates(&dir)?;
        match candidates.len() {
            0 => Err(RunError::NoEntryPoint {
                id: id.clone(),
                dir,
            }),
            1 => Ok(candidates.remove(0)),
            _ => Err(RunError::AmbiguousEntryPoint {
                id: id.clone(),
                candidates,
            }),
        }
    }

    /// Run `id` and persist `DONE`/`FAILED`.
    ///
    /// Precondition errors (no or several entry points) abort before anything
    /// is spawned or written.
    pub fn run<W: Write>(&self, id: &MigrationId, console: &mut W) -> Result<Outcome, RunError> {
        let entry = self.entry_point(id)?;
        let dir = self.settings.migration_dir(id);
        tracing::info!(
            id = %id,
            entry = %entry.display(),
            environment = %self.settings.environment(),
            "running migration"
        );

        let (exit_code, success, output) = self.execute(&entry, &dir, id, console)?;
        tracing::debug!(id = %id, exit_code = ?exit_code, "migration executable exited");

        let status = Status::from_exit(success);
        let registry = self.settings.registry();
        let previous = registry.get_status(id);
        if let Err(err) = check_transition(Trigger::Execute, previous, status) {
            tracing::warn!(id = %id, "{err}; recording anyway for an explicit run");
        }
        registry.set_status(id, status, &self.settings.branch())?;
        tracing::info!(id = %id, status = %status, "migration finished");

        Ok(Outcome {
            id: id.clone(),
            status,
            exit_code,
            output,
        })
    }

    fn execute<W: Write>(
        &self,
        entry: &Path,
        dir: &Path,
        id: &MigrationId,
        console: &mut W,
    ) -> Result<(Option<i32>, bool, String), RunError> {
        let mut child = Command::new(entry)
            .arg(self.settings.environment())
            .current_dir(dir)
            .envs(self.settings.child_env(id))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunError::Spawn {
                path: entry.to_path_buf(),
                source,
            })?;

        let (tx, rx) = mpsc::channel::<String>();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let mut transcript = Transcript::new(console);
        let mut pipes_closed = false;
        let status = loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => transcript.push(&line),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    pipes_closed = true;
                    break child.wait().map_err(|e| io_err(entry, e))?;
                }
            }
            if let Some(status) = child.try_wait().map_err(|e| io_err(entry, e))? {
                break status;
            }
        };

        // The script has exited. Lines it wrote may still be in flight, and a
        // background process it started may hold the pipes open indefinitely.
        if !pipes_closed {
            let deadline = Instant::now() + EXIT_GRACE;
            loop {
                match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(line) => transcript.push(&line),
                    Err(RecvTimeoutError::Disconnected) => {
                        pipes_closed = true;
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) => break,
                }
            }
        }
        if pipes_closed {
            join_readers(id, readers);
        } else {
            tracing::warn!(
                id = %id,
                "output pipes still open after exit, leaving them to a background process"
            );
        }

        Ok((status.code(), status.success(), transcript.output))
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const EXIT_GRACE: Duration = Duration::from_millis(250);

/// Relays lines to the console and keeps the combined output.
struct Transcript<'w, W: Write> {
    console: &'w mut W,
    console_ok: bool,
    output: String,
}

impl<'w, W: Write> Transcript<'w, W> {
    fn new(console: &'w mut W) -> Self {
        Self {
            console,
            console_ok: true,
            output: String::new(),
        }
    }

    fn push(&mut self, line: &str) {
        if self.console_ok {
            if let Err(err) = self
                .console
                .write_all(line.as_bytes())
                .and_then(|()| self.console.flush())
            {
                tracing::warn!(error = %err, "console write failed, output still captured");
                self.console_ok = false;
            }
        }
        self.output.push_str(line);
    }
}

/// Join finished reader threads. Returns how many of them panicked.
fn join_readers(id: &MigrationId, readers: Vec<thread::JoinHandle<()>>) -> usize {
    let mut panicked = 0;
    for reader in readers {
        if reader.join().is_err() {
            tracing::warn!(id = %id, "output reader panicked, transcript may be truncated");
            panicked += 1;
        }
    }
    panicked
}

// One thread per pipe; each complete line goes through the channel as soon as
// it is read.
fn forward_lines<R: Read + Send + 'static>(
    pipe: R,
    tx: mpsc::Sender<String>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let mut line = String::from_utf8_lossy(&buf).into_owned();
                    if !line.ends_with('\n') {
                        line.push('\n');
                    }
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "reading child output failed");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn settings(tmp: &TempDir) -> Settings {
        Settings::from_parts(tmp.path(), "dev", BTreeMap::new())
    }

    #[test]
    fn missing_directory_is_precondition_error() {
        let tmp = TempDir::new().unwrap();
        let s = settings(&tmp);
        let err = Engine::new(&s)
            .entry_point(&MigrationId::from("1500000000-none"))
            .unwrap_err();
        assert!(matches!(err, RunError::MissingDirectory { .. }));
        assert!(err.is_precondition());
    }

    #[test]
    fn no_entry_point_is_reported() {
        let tmp = TempDir::new().unwrap();
        let s = settings(&tmp);
        fs::create_dir_all(s.migrations_dir().join("1500000000-a")).unwrap();
        let err = Engine::new(&s)
            .entry_point(&MigrationId::from("1500000000-a"))
            .unwrap_err();
        assert!(matches!(err, RunError::NoEntryPoint { .. }), "got: {err}");
    }

    #[test]
    fn several_entry_points_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let s = settings(&tmp);
        let dir = s.migrations_dir().join("1500000000-a");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("migrate.sh"), b"").unwrap();
        fs::write(dir.join("migrate.py"), b"").unwrap();
        let err = Engine::new(&s)
            .entry_point(&MigrationId::from("1500000000-a"))
            .unwrap_err();
        match err {
            RunError::AmbiguousEntryPoint { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn single_entry_point_is_found() {
        let tmp = TempDir::new().unwrap();
        let s = settings(&tmp);
        let dir = s.migrations_dir().join("1500000000-a");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("migrate.sh"), b"").unwrap();
        fs::write(dir.join("README.md"), b"").unwrap();
        let entry = Engine::new(&s)
            .entry_point(&MigrationId::from("1500000000-a"))
            .unwrap();
        assert!(entry.ends_with("migrate.sh"));
    }

    #[test]
    fn panicked_reader_is_counted() {
        let readers = vec![
            thread::spawn(|| {}),
            thread::spawn(|| panic!("reader blew up")),
        ];
        assert_eq!(join_readers(&MigrationId::from("1500000000-a"), readers), 1);
    }

    #[test]
    fn transcript_survives_a_broken_console() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut console = Broken;
        let mut transcript = Transcript::new(&mut console);
        transcript.push("one\n");
        transcript.push("two\n");
        assert!(!transcript.console_ok);
        assert_eq!(transcript.output, "one\ntwo\n");
    }

    #[test]
    fn outcome_success_tracks_status() {
        let done = Outcome {
            id: MigrationId::from("x"),
            status: Status::Done,
            exit_code: Some(0),
            output: String::new(),
        };
        assert!(done.succeeded());
        let failed = Outcome {
            status: Status::Failed,
            exit_code: Some(1),
            ..done
        };
        assert!(!failed.succeeded());
    }
}
