use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ConfigSnapshot;
use crate::protocol::{ChildNotice, ControlMessage};

/// Output surfaced by the child's stdout scanner.
#[derive(Debug)]
pub enum ChildEvent {
    /// A passthrough log line from the server's stdout.
    Line(String),
    /// A control notice addressed to the supervisor.
    Notice(ChildNotice),
}

/// Handle for the one live server process. Creating a new one replaces
/// the previous: the old child is reaped on drop via kill_on_drop.
pub struct ChildHandle {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout_task: Option<JoinHandle<()>>,
    restartable: bool,
}

/// Locate the server binary: `ZERVER_BIN` if set, otherwise the
/// `zerver-server` binary next to the supervisor executable.
pub fn server_binary() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("ZERVER_BIN") {
        return Ok(PathBuf::from(path));
    }
    let exe = std::env::current_exe().context("cannot locate the supervisor executable")?;
    let dir = exe
        .parent()
        .context("supervisor executable has no parent directory")?;
    Ok(dir.join("zerver-server"))
}

impl ChildHandle {
    /// Spawn the server in the resolved working directory with the
    /// snapshot's argument vector. Its stdin carries control messages as
    /// JSON lines; its stdout is scanned for notices, with everything
    /// else forwarded as passthrough output. stderr is inherited.
    pub fn spawn(
        program: &Path,
        config: &ConfigSnapshot,
        restartable: bool,
        event_tx: mpsc::UnboundedSender<ChildEvent>,
    ) -> Result<Self> {
        let mut child = Command::new(program)
            .args(config.child_args())
            .current_dir(&config.root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn server {}", program.display()))?;

        let stdin = child.stdin.take();

        let stdout_task = child.stdout.take().map(|stdout| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let event = match ChildNotice::parse(&line) {
                        Some(notice) => ChildEvent::Notice(notice),
                        None => ChildEvent::Line(line),
                    };
                    if event_tx.send(event).is_err() {
                        return; // Supervisor is gone
                    }
                }
            })
        });

        Ok(Self {
            child,
            stdin,
            stdout_task,
            restartable,
        })
    }

    /// Whether the supervisor restarts this child when it exits.
    pub fn restartable(&self) -> bool {
        self.restartable
    }

    /// Best-effort delivery. The child may be mid-restart or already
    /// gone, so serialization and pipe failures are swallowed by policy.
    pub async fn send(&mut self, message: &ControlMessage) {
        let Some(stdin) = self.stdin.as_mut() else {
            return;
        };
        let Ok(mut payload) = serde_json::to_vec(message) else {
            return;
        };
        payload.push(b'\n');
        let _ = stdin.write_all(&payload).await;
        let _ = stdin.flush().await;
    }

    /// Best-effort kill: failure means the child already exited.
    pub fn kill(&mut self) {
        let _ = self.child.start_kill();
    }

    /// Observe the child's exit. Cancel-safe, usable inside select.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }
}

impl Drop for ChildHandle {
    fn drop(&mut self) {
        if let Some(task) = self.stdout_task.take() {
            task.abort();
        }
    }
}
