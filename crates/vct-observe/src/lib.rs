use anyhow::Result;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use uuid::Uuid;
use vct_core::{EventEnvelope, EventKind, runtime_dir};

/// Append-only event log for one session, plus stderr diagnostics.
///
/// Shared between the UI thread and request workers, so all state is
/// atomic and every log line is a single append.
pub struct Observer {
    log_path: PathBuf,
    session_id: Uuid,
    seq: AtomicU64,
    verbose: AtomicBool,
    stderr_muted: AtomicBool,
}

impl Observer {
    pub fn new(workspace: &Path) -> Result<Self> {
        let dir = runtime_dir(workspace);
        fs::create_dir_all(&dir)?;
        Ok(Self::with_log_path(dir.join("observe.log")))
    }

    pub fn with_log_path(log_path: PathBuf) -> Self {
        Self {
            log_path,
            session_id: Uuid::now_v7(),
            seq: AtomicU64::new(0),
            verbose: AtomicBool::new(false),
            stderr_muted: AtomicBool::new(false),
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn record(&self, kind: EventKind) -> Result<EventEnvelope> {
        let event = EventEnvelope {
            seq_no: self.seq.fetch_add(1, Ordering::SeqCst) + 1,
            at: Utc::now(),
            session_id: self.session_id,
            kind,
        };
        self.append_log_line(&format!(
            "{} EVENT {}",
            event.at.to_rfc3339(),
            serde_json::to_string(&event)?
        ))?;
        if event.kind.is_failure() {
            self.verbose_log(&format!("{} event #{}", event.kind.category(), event.seq_no));
        }
        Ok(event)
    }

    /// Records an event, downgrading a log write failure to a warning.
    pub fn record_or_warn(&self, kind: EventKind) {
        if let Err(err) = self.record(kind) {
            self.warn_log(&format!("failed to write event log: {err}"));
        }
    }

    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Relaxed);
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    /// Stops all stderr output, for while a full-screen UI owns the terminal.
    pub fn mute_stderr(&self, muted: bool) {
        self.stderr_muted.store(muted, Ordering::Relaxed);
    }

    pub fn verbose_log(&self, msg: &str) {
        if self.is_verbose() && !self.stderr_muted.load(Ordering::Relaxed) {
            eprintln!("[vct] {msg}");
        }
    }

    /// Always written to the log file; echoed to stderr unless muted.
    pub fn warn_log(&self, msg: &str) {
        if !self.stderr_muted.load(Ordering::Relaxed) {
            eprintln!("[vct WARN] {msg}");
        }
        let _ = self.append_log_line(&format!("{} WARN {msg}", Utc::now().to_rfc3339()));
    }

    fn append_log_line(&self, line: &str) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

/// Parses the `EVENT` lines of a log file back into envelopes.
pub fn read_events(log_path: &Path) -> Result<Vec<EventEnvelope>> {
    if !log_path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(log_path)?;
    let mut events = Vec::new();
    for line in raw.lines() {
        let Some((_, payload)) = line.split_once(" EVENT ") else {
            continue;
        };
        events.push(serde_json::from_str(payload)?);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vct_core::{Role, View};

    #[test]
    fn record_appends_numbered_events() {
        let workspace = tempfile::tempdir().expect("workspace");
        let observer = Observer::new(workspace.path()).expect("observer");
        observer
            .record(EventKind::TurnAppended {
                role: Role::User,
                chars: 5,
            })
            .expect("record");
        let second = observer
            .record(EventKind::ViewSelected {
                view: View::Strategy,
            })
            .expect("record");
        assert_eq!(second.seq_no, 2);

        let events = read_events(observer.log_path()).expect("read back");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].seq_no, 1);
        assert_eq!(events[0].session_id, observer.session_id());
        assert_eq!(
            events[1].kind,
            EventKind::ViewSelected {
                view: View::Strategy
            }
        );
    }

    #[test]
    fn warn_lines_are_skipped_when_reading_events() {
        let workspace = tempfile::tempdir().expect("workspace");
        let observer = Observer::new(workspace.path()).expect("observer");
        observer.mute_stderr(true);
        observer.warn_log("endpoint unreachable");
        observer.record_or_warn(EventKind::SessionReset { turns_cleared: 4 });

        let raw = fs::read_to_string(observer.log_path()).expect("log");
        assert!(raw.contains("WARN endpoint unreachable"));
        let events = read_events(observer.log_path()).expect("events");
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn missing_log_reads_as_empty() {
        let workspace = tempfile::tempdir().expect("workspace");
        let events = read_events(&workspace.path().join("nope.log")).expect("events");
        assert!(events.is_empty());
    }
}
