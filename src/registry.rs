//! Live tool sessions, at most one per tool name.
//!
//! Each session is a shell running inside a pty. A reader thread forwards output
//! and a waiter thread reaps the child and reports its exit code. Both threads
//! check, under the session table lock, that their session is still the one
//! registered for the name before emitting, so a replaced or killed session goes
//! quiet as soon as the call that removed it returns.

use crate::config::LauncherConfig;
use crate::error::{Error, Result};
use crate::events::{
    utf8_incomplete_tail, SessionData, SessionEvent, SessionEventSink, SessionExit,
};
use crate::shell::ShellSpec;
use parking_lot::Mutex;
use portable_pty::{native_pty_system, Child, ChildKiller, MasterPty, PtySize};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Exit code reported when the shell could not be started at all.
pub const SPAWN_FAILED_EXIT_CODE: i32 = -1;

// How long the exit notice waits for trailing output after the child is reaped.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartOutcome {
    pub accepted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KillOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct Session {
    id: u64,
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    pid: Option<u32>,
}

trait Terminate {
    fn terminate(&mut self) -> Result<()>;
}

impl Terminate for Session {
    /// Hard kill, no grace period.
    fn terminate(&mut self) -> Result<()> {
        #[cfg(unix)]
        {
            if let Some(pid) = self.pid {
                // The pty child leads its own process group; take its descendants too.
                let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
                if rc == 0 {
                    return Ok(());
                }
                log::debug!(
                    "[Registry] Group kill of {} failed: {}",
                    pid,
                    std::io::Error::last_os_error()
                );
            }
        }
        self.killer.kill().map_err(Error::from)
    }
}

struct Shared {
    sessions: Mutex<HashMap<String, Session>>,
    sink: Arc<dyn SessionEventSink>,
}

impl Shared {
    fn is_current(sessions: &HashMap<String, Session>, name: &str, id: u64) -> bool {
        sessions.get(name).map(|s| s.id == id).unwrap_or(false)
    }
}

pub struct ProcessRegistry {
    shared: Arc<Shared>,
    next_id: AtomicU64,
    shell: ShellSpec,
    size: PtySize,
    term: String,
}

impl ProcessRegistry {
    /// `sink` is called with the session table locked and must not call back
    /// into the registry.
    pub fn new(config: &LauncherConfig, sink: Arc<dyn SessionEventSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                sessions: Mutex::new(HashMap::new()),
                sink,
            }),
            next_id: AtomicU64::new(1),
            shell: ShellSpec::resolve(config.shell.as_deref()),
            size: PtySize {
                rows: config.pty_rows,
                cols: config.pty_cols,
                pixel_width: 0,
                pixel_height: 0,
            },
            term: config.term.clone(),
        }
    }

    pub fn shell(&self) -> &ShellSpec {
        &self.shell
    }

    /// Run `command` for `name`, replacing any session already running under that name.
    ///
    /// Empty arguments and a `working_dir` that is not an existing directory are
    /// rejected before any running session is touched. If the shell cannot be spawned the
    /// outcome is not accepted and an exit event with [`SPAWN_FAILED_EXIT_CODE`]
    /// is emitted for `name`.
    pub fn start(&self, command: &str, working_dir: &str, name: &str) -> Result<StartOutcome> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("tool name must not be empty".into()));
        }
        if command.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "tool '{}' has no start command",
                name
            )));
        }
        // The pty command builder silently falls back to $HOME for a bad cwd.
        if working_dir.trim().is_empty() || !Path::new(working_dir).is_dir() {
            return Err(Error::InvalidPath(format!(
                "working directory for '{}' is not a directory: {:?}",
                name, working_dir
            )));
        }

        let mut sessions = self.shared.sessions.lock();

        if let Some(mut old) = sessions.remove(name) {
            log::info!("[Registry] Replacing running session for '{}'", name);
            if let Err(e) = old.terminate() {
                if e.is_teardown_race() {
                    log::debug!("[Registry] Old session for '{}' already gone: {}", name, e);
                } else {
                    log::warn!("[Registry] Failed to kill old session for '{}': {}", name, e);
                }
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (session, reader, child) = match self.spawn(id, command, working_dir) {
            Ok(parts) => parts,
            Err(e) => {
                log::error!("[Registry] Failed to start '{}': {}", name, e);
                self.shared.sink.emit(SessionEvent::Exit(SessionExit {
                    tool_name: name.to_string(),
                    exit_code: SPAWN_FAILED_EXIT_CODE,
                }));
                return Ok(StartOutcome { accepted: false });
            }
        };

        log::info!(
            "[Registry] Started '{}' (pid {:?}) with {} in {}",
            name,
            session.pid,
            self.shell.program,
            working_dir
        );
        sessions.insert(name.to_string(), session);

        let (done_tx, done_rx) = mpsc::channel();
        spawn_reader(self.shared.clone(), name.to_string(), id, reader, done_tx);
        spawn_waiter(self.shared.clone(), name.to_string(), id, child, done_rx);

        Ok(StartOutcome { accepted: true })
    }

    fn spawn(
        &self,
        id: u64,
        command: &str,
        working_dir: &str,
    ) -> Result<(Session, Box<dyn Read + Send>, Box<dyn Child + Send + Sync>)> {
        let pair = native_pty_system()
            .openpty(self.size)
            .map_err(|e| Error::Pty(format!("failed to open pty: {}", e)))?;

        let cmd = self.shell.command(command, working_dir, &self.term);
        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| Error::Pty(format!("failed to spawn {}: {}", self.shell.program, e)))?;
        // Only the child may hold the slave end, or the reader never sees EOF.
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| Error::Pty(format!("failed to get pty reader: {}", e)))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| Error::Pty(format!("failed to get pty writer: {}", e)))?;

        let session = Session {
            id,
            master: pair.master,
            writer,
            killer: child.clone_killer(),
            pid: child.process_id(),
        };
        Ok((session, reader, child))
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.shared.sessions.lock().contains_key(name)
    }

    pub fn running_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.sessions.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Send input to the session for `name`. Does nothing if there is none.
    pub fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let mut sessions = self.shared.sessions.lock();
        let Some(session) = sessions.get_mut(name) else {
            return Ok(());
        };
        let result = session
            .writer
            .write_all(data)
            .and_then(|_| session.writer.flush());
        match result {
            Ok(()) => Ok(()),
            Err(e) if crate::error::is_closed_pipe(&e) => {
                log::debug!("[Registry] Dropped input for exiting '{}': {}", name, e);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn resize(&self, name: &str, cols: u16, rows: u16) -> Result<()> {
        let sessions = self.shared.sessions.lock();
        let session = sessions
            .get(name)
            .ok_or_else(|| Error::NotRunning(name.to_string()))?;
        session
            .master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| Error::Pty(format!("failed to resize pty: {}", e)))
    }

    /// Kill and forget the session for `name`. No exit event follows.
    pub fn kill(&self, name: &str) -> Result<KillOutcome> {
        let Some(mut session) = self.shared.sessions.lock().remove(name) else {
            return Ok(KillOutcome {
                success: false,
                error: Some("Process not running".to_string()),
            });
        };

        match session.terminate() {
            Ok(()) => log::info!("[Registry] Killed '{}'", name),
            Err(e) if e.is_teardown_race() => {
                log::debug!("[Registry] '{}' exited before kill: {}", name, e)
            }
            Err(e) => return Err(e),
        }
        Ok(KillOutcome {
            success: true,
            error: None,
        })
    }

    /// Kill every session. Failures are logged and never stop the sweep.
    pub fn shutdown_all(&self) -> usize {
        let drained: Vec<(String, Session)> = self.shared.sessions.lock().drain().collect();
        if drained.is_empty() {
            return 0;
        }

        log::info!("[Registry] Shutting down {} session(s)", drained.len());
        let count = sweep(drained);
        log::info!("[Registry] Shutdown complete");
        count
    }
}

/// Terminate each session in turn; returns how many were visited.
fn sweep<T: Terminate>(sessions: Vec<(String, T)>) -> usize {
    let count = sessions.len();
    for (name, mut session) in sessions {
        match session.terminate() {
            Ok(()) => {}
            Err(e) if e.is_teardown_race() => {
                log::debug!("[Registry] '{}' already closed: {}", name, e)
            }
            Err(e) => log::warn!("[Registry] Failed to kill '{}' during shutdown: {}", name, e),
        }
    }
    count
}

impl Drop for ProcessRegistry {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}

/// Emit output if session `id` is still the one registered for `name`.
fn emit_data(shared: &Shared, name: &str, id: u64, data: Vec<u8>) -> bool {
    let sessions = shared.sessions.lock();
    if !Shared::is_current(&sessions, name, id) {
        return false;
    }
    shared.sink.emit(SessionEvent::Data(SessionData {
        tool_name: name.to_string(),
        data,
    }));
    true
}

fn spawn_reader(
    shared: Arc<Shared>,
    name: String,
    id: u64,
    mut reader: Box<dyn Read + Send>,
    done: mpsc::Sender<()>,
) {
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        // Bytes of a UTF-8 sequence split across reads, prepended to the next chunk.
        let mut pending: Vec<u8> = Vec::new();
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    let complete = pending.len() - utf8_incomplete_tail(&pending);
                    if complete == 0 {
                        continue;
                    }
                    let data: Vec<u8> = pending.drain(..complete).collect();
                    if !emit_data(&shared, &name, id, data) {
                        pending.clear();
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                // EIO once the child side of the pty is gone.
                Err(_) => break,
            }
        }
        if !pending.is_empty() {
            emit_data(&shared, &name, id, pending);
        }
        let _ = done.send(());
    });
}

fn spawn_waiter(
    shared: Arc<Shared>,
    name: String,
    id: u64,
    mut child: Box<dyn Child + Send + Sync>,
    reader_done: mpsc::Receiver<()>,
) {
    thread::spawn(move || {
        let exit_code = match child.wait() {
            Ok(status) => status.exit_code() as i32,
            Err(e) => {
                log::warn!("[Registry] Failed to wait for '{}': {}", name, e);
                SPAWN_FAILED_EXIT_CODE
            }
        };
        // Background children can keep the pty open; do not wait on them forever.
        let _ = reader_done.recv_timeout(OUTPUT_DRAIN_TIMEOUT);

        let mut sessions = shared.sessions.lock();
        if !Shared::is_current(&sessions, &name, id) {
            return;
        }
        sessions.remove(&name);
        log::info!("[Registry] '{}' exited with code {}", name, exit_code);
        shared.sink.emit(SessionEvent::Exit(SessionExit {
            tool_name: name,
            exit_code,
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::AtomicUsize;

    struct FakeSession {
        outcome: Option<io::ErrorKind>,
        calls: Arc<AtomicUsize>,
    }

    impl Terminate for FakeSession {
        fn terminate(&mut self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                None => Ok(()),
                Some(kind) => Err(io::Error::new(kind, "terminate failed").into()),
            }
        }
    }

    #[test]
    fn sweep_survives_closed_and_failing_sessions() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fake = |outcome| FakeSession {
            outcome,
            calls: calls.clone(),
        };
        let sessions = vec![
            ("gone".to_string(), fake(Some(io::ErrorKind::BrokenPipe))),
            ("denied".to_string(), fake(Some(io::ErrorKind::PermissionDenied))),
            ("live".to_string(), fake(None)),
        ];

        assert_eq!(sweep(sessions), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
