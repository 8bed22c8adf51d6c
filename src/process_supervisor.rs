//! # Process Supervisor Module
//!
//! Esegue un encode esterno come unità di lavoro cancellabile con deadline.
//!
//! ## Ciclo di vita:
//! `Running` → `Completed` | `TimedOut` | `Failed`
//!
//! ## Responsabilità:
//! - Avvia il processo in un process group dedicato (Unix), con stdio scartato
//! - Allo scadere della deadline invia SIGTERM al gruppo, attende la grace window,
//!   poi SIGKILL a gruppo e processo
//! - Raccoglie sempre lo stato di uscita del figlio (niente zombie)
//! - Cancella sempre l'output parziale in caso di fallimento
//! - Logga la causa specifica (timeout, exit code, errore di I/O)
//!
//! Un timeout segnala solo il process group del proprio tentativo: i job
//! concorrenti non vengono mai toccati.

use crate::error::OptimizeError;
use crate::file_manager::FileManager;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

#[cfg(unix)]
use nix::{
    errno::Errno,
    sys::signal::{killpg, Signal},
    unistd::Pid,
};

/// Lifecycle of one supervised encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Completed,
    TimedOut,
    Failed,
}

/// Runs external encodes with a deadline and a kill grace window
#[derive(Debug, Clone, Copy)]
pub struct ProcessSupervisor {
    deadline: Duration,
    grace: Duration,
}

impl ProcessSupervisor {
    pub fn new(deadline: Duration, grace: Duration) -> Self {
        Self { deadline, grace }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run `command` to completion or until the deadline.
    ///
    /// `output` is the file the command writes; it is deleted on every failure path.
    pub async fn run(&self, command: std::process::Command, output: &Path) -> Result<(), OptimizeError> {
        let mut task = match SupervisedTask::spawn(command, output) {
            Ok(task) => task,
            Err(e) => {
                warn!("Failed to start encoder for {}: {}", output.display(), e);
                FileManager::remove_if_exists(output).await;
                return Err(e);
            }
        };

        let result = task.wait(self.deadline, self.grace).await;
        debug!(
            "{} finished as {:?} in {:?}",
            task.tool,
            task.state(),
            task.started.elapsed()
        );
        result
    }
}

/// A spawned encode and the process group it owns
pub struct SupervisedTask {
    tool: String,
    child: Child,
    process_group: Option<i32>,
    state: TaskState,
    output: PathBuf,
    started: Instant,
}

impl SupervisedTask {
    /// Spawn the command in its own process group
    pub fn spawn(command: std::process::Command, output: &Path) -> Result<Self, OptimizeError> {
        let tool = Path::new(command.get_program())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| command.get_program().to_string_lossy().into_owned());

        let mut command = command;
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut command = Command::from(command);
        command.kill_on_drop(true);

        let child = command.spawn()?;
        // With process_group(0) the group id is the child's pid
        let process_group = if cfg!(unix) {
            child.id().map(|pid| pid as i32)
        } else {
            None
        };

        Ok(Self {
            tool,
            child,
            process_group,
            state: TaskState::Running,
            output: output.to_path_buf(),
            started: Instant::now(),
        })
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Wait for exit; on deadline, terminate the whole process tree
    pub async fn wait(&mut self, deadline: Duration, grace: Duration) -> Result<(), OptimizeError> {
        match tokio::time::timeout(deadline, self.child.wait()).await {
            Ok(Ok(status)) if status.success() => {
                self.state = TaskState::Completed;
                Ok(())
            }
            Ok(Ok(status)) => {
                self.state = TaskState::Failed;
                warn!("{} failed for {}: {}", self.tool, self.output.display(), status);
                FileManager::remove_if_exists(&self.output).await;
                Err(OptimizeError::AttemptFailed {
                    tool: self.tool.clone(),
                    status: status.to_string(),
                })
            }
            Ok(Err(e)) => {
                self.state = TaskState::Failed;
                warn!("I/O error while waiting for {}: {}", self.tool, e);
                self.terminate(grace).await;
                FileManager::remove_if_exists(&self.output).await;
                Err(OptimizeError::Io(e))
            }
            Err(_) => {
                self.state = TaskState::TimedOut;
                warn!(
                    "⏱️ {} exceeded {:?} for {}, terminating process tree",
                    self.tool,
                    deadline,
                    self.output.display()
                );
                self.terminate(grace).await;
                FileManager::remove_if_exists(&self.output).await;
                Err(OptimizeError::Timeout {
                    tool: self.tool.clone(),
                    elapsed: self.started.elapsed(),
                })
            }
        }
    }

    /// SIGTERM, grace window, SIGKILL; always reaps the child
    async fn terminate(&mut self, grace: Duration) {
        self.signal_group(SignalKind::Terminate);
        if self.process_group.is_none() {
            let _ = self.child.start_kill();
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(_) => debug!("{} exited after termination request", self.tool),
            Err(_) => {
                warn!("{} ignored termination, force killing", self.tool);
                self.signal_group(SignalKind::Kill);
                if let Err(e) = self.child.kill().await {
                    debug!("kill({}) returned {}", self.tool, e);
                }
            }
        }

        if let Err(e) = self.child.wait().await {
            warn!("Failed to reap {}: {}", self.tool, e);
        }
        // Descendants that ignored SIGTERM keep the group alive
        self.signal_group(SignalKind::Kill);
    }

    #[cfg(unix)]
    fn signal_group(&self, kind: SignalKind) {
        let Some(pgid) = self.process_group else {
            return;
        };
        let signal = match kind {
            SignalKind::Terminate => Signal::SIGTERM,
            SignalKind::Kill => Signal::SIGKILL,
        };
        match killpg(Pid::from_raw(pgid), signal) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => debug!("killpg({}, {:?}) failed: {}", pgid, signal, e),
        }
    }

    #[cfg(not(unix))]
    fn signal_group(&self, _kind: SignalKind) {}
}

#[derive(Debug, Clone, Copy)]
enum SignalKind {
    Terminate,
    Kill,
}
