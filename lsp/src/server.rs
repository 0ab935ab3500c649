//! Analyzer supervisor: owns the single analyzer process and its watch set.

use std::collections::BTreeSet;
use std::ffi::OsString;
#[cfg(unix)]
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::timeout;

use crate::codec::{DrainError, FrameReader};
use crate::command::AnalyzerCommand;
use crate::diagnostics::DiagnosticsStore;

/// How long a terminated analyzer gets to exit before it is killed.
const TERMINATE_GRACE_SECS: u64 = 2;

/// One live analyzer process and the reader over its stdout.
pub struct AnalyzerProcess {
    child: Child,
    pid: Option<u32>,
    reader: FrameReader<ChildStdout>,
}

impl AnalyzerProcess {
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Drain every report the analyzer prints until it goes quiet for
    /// `per_line`.
    pub async fn drain(
        &mut self,
        per_line: Duration,
    ) -> Result<Vec<serde_json::Value>, DrainError> {
        self.reader.drain(per_line).await
    }

    /// Whether the process is gone (or can no longer be polled).
    fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!(pid = ?self.pid, %status, "Analyzer exited on its own");
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(pid = ?self.pid, "Failed to poll analyzer status: {e}");
                true
            }
        }
    }

    /// Ask the process (group) to stop, then wait for it. Falls back to a
    /// kill if it is still alive after the grace period.
    async fn terminate(mut self) {
        signal_process_group(&mut self.child, Signal::Terminate);

        match timeout(Duration::from_secs(TERMINATE_GRACE_SECS), self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(pid = ?self.pid, %status, "Analyzer terminated");
            }
            Ok(Err(e)) => {
                tracing::warn!(pid = ?self.pid, "Failed waiting for analyzer exit: {e}");
            }
            Err(_) => {
                tracing::debug!(pid = ?self.pid, "Analyzer didn't exit in time, killing");
                signal_process_group(&mut self.child, Signal::Kill);
                if let Err(e) = self.child.kill().await {
                    tracing::warn!(pid = ?self.pid, "Failed to kill analyzer: {e}");
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Terminate,
    Kill,
}

#[cfg(unix)]
fn signal_process_group(child: &mut Child, signal: Signal) {
    let Some(pid) = child.id() else {
        return;
    };
    let signo = match signal {
        Signal::Terminate => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    // The child leads its own process group (see `isolate_process_group`),
    // so this also reaches any workers it started.
    unsafe {
        if libc::killpg(pid as i32, signo) == -1 {
            let _ = child.start_kill();
        }
    }
}

#[cfg(not(unix))]
fn signal_process_group(child: &mut Child, _signal: Signal) {
    let _ = child.start_kill();
}

/// Put the child in its own session so the whole process group can be
/// signalled, and (Linux) have it die with us.
#[cfg(unix)]
fn isolate_process_group(cmd: &mut Command) {
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            #[cfg(target_os = "linux")]
            if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL) == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
fn isolate_process_group(_cmd: &mut Command) {}

/// Owns the "current analyzer" slot, the cumulative watch set, and the
/// cached invocation template.
///
/// Holding `&mut AnalyzerSupervisor` is the single-flight guarantee: at most
/// one `ensure_running` is ever in progress.
pub struct AnalyzerSupervisor {
    command: AnalyzerCommand,
    workspace_root: PathBuf,
    watch_set: BTreeSet<PathBuf>,
    process: Option<AnalyzerProcess>,
    spawn_count: u64,
    /// Full argv (program first) of the most recent spawn attempt.
    last_invocation: Vec<OsString>,
}

impl AnalyzerSupervisor {
    pub fn new(command: AnalyzerCommand, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            command,
            workspace_root: workspace_root.into(),
            watch_set: BTreeSet::new(),
            process: None,
            spawn_count: 0,
            last_invocation: Vec::new(),
        }
    }

    /// Return a process that covers `file`, starting or restarting the
    /// analyzer as needed.
    ///
    /// The live process is reused only when `file` already has results in
    /// `store`. Otherwise the live process (if any) is terminated and reaped,
    /// `file` joins the watch set, and a fresh analyzer is spawned over the
    /// whole set.
    pub async fn ensure_running(
        &mut self,
        file: &Path,
        store: &DiagnosticsStore,
    ) -> Result<&mut AnalyzerProcess> {
        if self.process.as_mut().is_some_and(AnalyzerProcess::has_exited) {
            self.process = None;
        }

        if self.process.is_some() && store.contains(file) {
            return self
                .process
                .as_mut()
                .context("analyzer slot emptied unexpectedly");
        }

        if let Some(previous) = self.process.take() {
            tracing::info!(
                pid = ?previous.pid(),
                path = %file.display(),
                "Restarting analyzer to watch a new file"
            );
            previous.terminate().await;
        }

        self.watch_set.insert(file.to_path_buf());
        let process = self.spawn()?;
        Ok(self.process.insert(process))
    }

    fn spawn(&mut self) -> Result<AnalyzerProcess> {
        let program = self.command.program().to_string();
        let args = self
            .command
            .args_for(self.watch_set.iter().map(PathBuf::as_path));

        self.last_invocation = Vec::with_capacity(args.len() + 1);
        self.last_invocation.push(OsString::from(&program));
        self.last_invocation.extend(args.iter().cloned());

        let resolved =
            which::which(&program).with_context(|| format!("{program} not found in PATH"))?;

        let mut cmd = Command::new(&resolved);
        cmd.args(&args)
            .current_dir(&self.workspace_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        isolate_process_group(&mut cmd);

        let mut child = cmd.spawn().with_context(|| format!("spawning {program}"))?;
        let stdout = child.stdout.take().context("no stdout from analyzer")?;
        let pid = child.id();
        self.spawn_count += 1;

        tracing::info!(
            pid = ?pid,
            program = %resolved.display(),
            files = self.watch_set.len(),
            "Started analyzer"
        );

        Ok(AnalyzerProcess {
            child,
            pid,
            reader: FrameReader::new(stdout),
        })
    }

    /// Terminate and forget the live process so the next
    /// [`ensure_running`](Self::ensure_running) starts fresh.
    pub async fn invalidate(&mut self) {
        if let Some(process) = self.process.take() {
            process.terminate().await;
        }
    }

    /// Swap in a new invocation template. A changed template retires the
    /// live process; the watch set is kept.
    pub async fn reconfigure(&mut self, command: AnalyzerCommand) {
        if command == self.command {
            return;
        }
        tracing::info!(program = command.program(), "Analyzer configuration changed");
        self.command = command;
        self.invalidate().await;
    }

    pub async fn shutdown(&mut self) {
        self.invalidate().await;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(AnalyzerProcess::pid)
    }

    /// Number of processes spawned over the supervisor's lifetime.
    #[must_use]
    pub fn spawn_count(&self) -> u64 {
        self.spawn_count
    }

    #[must_use]
    pub fn watch_set(&self) -> &BTreeSet<PathBuf> {
        &self.watch_set
    }

    #[must_use]
    pub fn command(&self) -> &AnalyzerCommand {
        &self.command
    }

    #[must_use]
    pub fn last_invocation(&self) -> &[OsString] {
        &self.last_invocation
    }
}
