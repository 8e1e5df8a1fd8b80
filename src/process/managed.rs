// src/process/managed.rs

//! One invocation of an external command and its lifecycle.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout, timeout_at};
use tracing::{debug, error, info, warn};

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{Signal, killpg};
#[cfg(unix)]
use nix::unistd::Pid;

use crate::process::command::{CmdOptions, CommandLine};
use crate::process::error::ProcessError;
use crate::process::sink::{Stream, spawn_drain};

/// How long `start_async` waits before checking the child is still alive.
pub const LIVENESS_CHECK_DELAY: Duration = Duration::from_millis(100);

/// Upper bound on waiting for all output drains once the child has exited.
///
/// A grandchild that left the process group can keep the pipes open forever.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Public, read-only view of where a [`ManagedProcess`] is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    Unstarted,
    Running,
    /// Exited on its own, or in response to `stop_async`.
    Completed(ExitStatus),
    /// Killed after its timeout (or after ignoring SIGTERM).
    Killed,
    /// Could not be started or waited on.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Sync,
    Async,
}

struct Running {
    child: Child,
    drains: Vec<JoinHandle<()>>,
}

/// A command that is started at most once, either synchronously with
/// [`run`](Self::run) or as a background helper with
/// [`start_async`](Self::start_async) / [`stop_async`](Self::stop_async).
///
/// On unix the child leads its own process group, so timeouts and stops
/// reach everything it spawned. Dropping a running process kills the child.
pub struct ManagedProcess {
    command: CommandLine,
    options: CmdOptions,
    state: ProcessState,
    mode: Option<Mode>,
    running: Option<Running>,
    pid: Option<u32>,
    stopped: bool,
}

impl ManagedProcess {
    pub fn new(command: CommandLine, options: CmdOptions) -> Self {
        Self {
            command,
            options,
            state: ProcessState::Unstarted,
            mode: None,
            running: None,
            pid: None,
            stopped: false,
        }
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.command
    }

    pub fn state(&self) -> &ProcessState {
        &self.state
    }

    /// OS process id of the child, once it has been spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Start the child and wait for it to exit.
    ///
    /// Output is drained into the configured sinks while the child runs. If a
    /// timeout is configured and expires, the child is killed and reaped
    /// before `TimedOut` is returned. A non-zero exit is an error.
    pub async fn run(&mut self) -> Result<(), ProcessError> {
        self.begin(Mode::Sync)?;
        let mut running = self.spawn()?;

        let waited = match self.options.timeout {
            Some(limit) => {
                let outcome = timeout(limit, running.child.wait()).await;
                match outcome {
                    Ok(waited) => waited,
                    Err(_) => return self.kill_after_timeout(running, limit).await,
                }
            }
            None => running.child.wait().await,
        };

        let status = match waited {
            Ok(status) => status,
            Err(source) => {
                self.state = ProcessState::Failed(source.to_string());
                return Err(ProcessError::Wait {
                    command: self.command.clone(),
                    source,
                });
            }
        };

        join_drains(&self.command, running.drains).await;
        self.finish(status)
    }

    /// Start a long-lived helper (port-forward, proxy) and return once it has
    /// survived a short liveness check.
    ///
    /// The configured timeout does not apply. A child that already exited
    /// non-zero by the time of the check is reported immediately.
    pub async fn start_async(&mut self) -> Result<(), ProcessError> {
        self.begin(Mode::Async)?;
        let mut running = self.spawn()?;

        sleep(LIVENESS_CHECK_DELAY).await;

        match running.child.try_wait() {
            Ok(None) => {
                debug!(command = %self.command, pid = ?self.pid, "background process is up");
                self.running = Some(running);
                Ok(())
            }
            Ok(Some(status)) => {
                warn!(
                    command = %self.command,
                    exit_code = ?status.code(),
                    "background process exited during startup"
                );
                join_drains(&self.command, running.drains).await;
                self.finish(status)
            }
            Err(source) => {
                self.running = Some(running);
                Err(ProcessError::Wait {
                    command: self.command.clone(),
                    source,
                })
            }
        }
    }

    /// Send SIGTERM to a process started with `start_async` (and its process
    /// group) and wait for it.
    ///
    /// Exiting in response to the signal counts as success, whatever the exit
    /// status. A child still alive after the stop grace period is killed and
    /// `IgnoredTermination` is returned.
    pub async fn stop_async(&mut self) -> Result<(), ProcessError> {
        match self.mode {
            None => return Err(self.usage("stop requested for a process that was never started")),
            Some(Mode::Sync) => {
                return Err(self.usage("stop requested for a process that was run synchronously"));
            }
            Some(Mode::Async) => {}
        }
        if self.stopped {
            return Err(self.usage("process was already stopped"));
        }

        let Some(mut running) = self.running.take() else {
            if matches!(self.state, ProcessState::Failed(_)) {
                return Err(self.usage("stop requested for a process that never launched"));
            }
            self.stopped = true;
            debug!(command = %self.command, "background process already exited; nothing to stop");
            return Ok(());
        };

        if let Err(source) = terminate(&mut running.child) {
            self.running = Some(running);
            return Err(ProcessError::Signal {
                command: self.command.clone(),
                source,
            });
        }
        self.stopped = true;

        let grace = self.options.stop_grace;
        let outcome = timeout(grace, running.child.wait()).await;
        match outcome {
            Ok(Ok(status)) => {
                // Leftovers that outlived the leader would hold the pipes open.
                if let Err(e) = kill_group(self.pid) {
                    debug!(command = %self.command, error = %e, "failed to clear process group");
                }
                join_drains(&self.command, running.drains).await;
                info!(command = %self.command, %status, "background process stopped");
                self.state = ProcessState::Completed(status);
                Ok(())
            }
            Ok(Err(source)) => {
                self.state = ProcessState::Failed(source.to_string());
                Err(ProcessError::Wait {
                    command: self.command.clone(),
                    source,
                })
            }
            Err(_) => {
                warn!(
                    command = %self.command,
                    grace_ms = grace.as_millis() as u64,
                    "process ignored SIGTERM; killing"
                );
                if let Err(e) = kill_tree(&mut running.child, self.pid).await {
                    warn!(command = %self.command, error = %e, "failed to kill process");
                }
                join_drains(&self.command, running.drains).await;
                self.state = ProcessState::Killed;
                Err(ProcessError::IgnoredTermination {
                    command: self.command.clone(),
                    grace,
                })
            }
        }
    }

    fn begin(&mut self, mode: Mode) -> Result<(), ProcessError> {
        if self.mode.is_some() {
            return Err(self.usage("process was already started"));
        }
        self.mode = Some(mode);
        Ok(())
    }

    fn usage(&self, reason: &'static str) -> ProcessError {
        error!(command = %self.command, reason, "invalid use of managed process");
        ProcessError::InvalidUsage {
            command: self.command.clone(),
            reason,
        }
    }

    fn spawn(&mut self) -> Result<Running, ProcessError> {
        if self.options.print_command {
            info!(command = %self.command, "running command");
        } else {
            debug!(command = %self.command, "running command");
        }

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .envs(&self.options.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                self.state = ProcessState::Failed(source.to_string());
                return Err(ProcessError::StartFailed {
                    command: self.command.clone(),
                    source,
                });
            }
        };

        self.pid = child.id();
        let label = self.command.to_string();
        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(spawn_drain(
                stdout,
                Stream::Stdout,
                label.clone(),
                self.options.stdout.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(spawn_drain(
                stderr,
                Stream::Stderr,
                label,
                self.options.stderr.clone(),
            ));
        }

        self.state = ProcessState::Running;
        Ok(Running { child, drains })
    }

    async fn kill_after_timeout(
        &mut self,
        mut running: Running,
        limit: Duration,
    ) -> Result<(), ProcessError> {
        warn!(
            command = %self.command,
            timeout_ms = limit.as_millis() as u64,
            "command timed out; killing process"
        );
        if let Err(e) = kill_tree(&mut running.child, self.pid).await {
            warn!(command = %self.command, error = %e, "failed to kill timed-out process");
        }
        join_drains(&self.command, running.drains).await;
        self.state = ProcessState::Killed;
        Err(ProcessError::TimedOut {
            command: self.command.clone(),
            timeout: limit,
        })
    }

    fn finish(&mut self, status: ExitStatus) -> Result<(), ProcessError> {
        self.state = ProcessState::Completed(status);
        debug!(
            command = %self.command,
            exit_code = ?status.code(),
            success = status.success(),
            "process exited"
        );

        if status.success() {
            Ok(())
        } else {
            Err(ProcessError::ExitedNonZero {
                command: self.command.clone(),
                status,
            })
        }
    }
}

impl std::fmt::Debug for ManagedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedProcess")
            .field("command", &self.command.to_string())
            .field("state", &self.state)
            .field("pid", &self.pid)
            .finish()
    }
}

/// SIGTERM to the child's process group.
#[cfg(unix)]
fn terminate(child: &mut Child) -> io::Result<()> {
    // `id()` is gone once the child has been reaped; nothing left to signal.
    let Some(pid) = child.id() else {
        return Ok(());
    };
    signal_group(pid, Signal::SIGTERM)
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}

/// SIGKILL the whole group, then reap the leader.
#[cfg(unix)]
async fn kill_tree(child: &mut Child, pid: Option<u32>) -> io::Result<()> {
    match pid {
        Some(pid) => {
            if let Err(e) = signal_group(pid, Signal::SIGKILL) {
                // At least take down the leader.
                child.kill().await?;
                return Err(e);
            }
            child.wait().await.map(drop)
        }
        None => child.kill().await,
    }
}

#[cfg(not(unix))]
async fn kill_tree(child: &mut Child, _pid: Option<u32>) -> io::Result<()> {
    child.kill().await
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) -> io::Result<()> {
    match pid {
        Some(pid) => signal_group(pid, Signal::SIGKILL),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) -> io::Result<()> {
    Ok(())
}

/// The group id equals the leader's pid (`process_group(0)` at spawn).
/// An empty group is not an error.
#[cfg(unix)]
fn signal_group(pgid: u32, signal: Signal) -> io::Result<()> {
    match killpg(Pid::from_raw(pgid as i32), signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

/// Wait for every drain under one shared grace period.
async fn join_drains(command: &CommandLine, drains: Vec<JoinHandle<()>>) {
    let deadline = Instant::now() + DRAIN_GRACE;
    for mut drain in drains {
        match timeout_at(deadline, &mut drain).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(command = %command, error = %e, "output drain task failed"),
            Err(_) => {
                warn!(command = %command, "output pipe still open after exit; abandoning drain");
                drain.abort();
            }
        }
    }
}
