use std::io::Write;
use std::path::Path;
use std::process::ExitStatus;

use anyhow::{Context, Result, bail};
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep, sleep_until};

use crate::child::{self, ChildEvent, ChildHandle};
use crate::config::ConfigSnapshot;
use crate::console::{Console, ConsoleAction, ConsoleMode};
use crate::debounce::{CHANGE_TIMEOUT, ChangeAction, Debouncer};
use crate::protocol::ControlMessage;
use crate::watch::ChangeWatcher;

/// Delay between respawn attempts when the server binary is briefly
/// unavailable (e.g. mid-rebuild).
const RESPAWN_RETRY: Duration = Duration::from_millis(500);

/// Requests supervisor teardown from outside the loop. This is the only
/// external path to the supervisor's shutdown flag.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl ShutdownHandle {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Idempotent: later requests are no-ops once teardown has begun.
    pub fn shutdown(&self) {
        let _ = self.tx.send(());
    }
}

fn exit_code(status: std::io::Result<ExitStatus>) -> i32 {
    // A kill or signal death carries no code; treat it as clean.
    status.ok().and_then(|s| s.code()).unwrap_or(0)
}

/// The restart decision for an observed child exit: restart only a
/// restartable launch, and never once the shutdown flag is set.
fn should_restart(shutdown: bool, restartable: bool) -> bool {
    !shutdown && restartable
}

/// No-restart mode, used outside debug: launch the server once and
/// mirror its exit outcome. Any exit, clean or crash, terminates the
/// supervisor with the child's exit code. Watcher and console are
/// bypassed entirely.
pub async fn run_once(config: ConfigSnapshot) -> Result<i32> {
    let program = child::server_binary()?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut handle = ChildHandle::spawn(&program, &config, false, event_tx)?;

    loop {
        tokio::select! {
            status = handle.wait() => {
                return Ok(exit_code(status));
            }
            Some(event) = event_rx.recv() => {
                if let ChildEvent::Line(line) = event {
                    println!("{line}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                handle.kill();
                let _ = handle.wait().await;
                return Ok(0);
            }
        }
    }
}

/// Debug mode entry point: wires Ctrl-C to the shutdown handle and runs
/// the supervision loop.
pub async fn run_debug(config: ConfigSnapshot) -> Result<i32> {
    let (shutdown, shutdown_rx) = ShutdownHandle::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.shutdown();
        }
    });
    run_debug_with(config, shutdown_rx).await
}

/// Debug mode: supervise the server across crashes, classify file
/// changes into refresh or restart, and multiplex the command console
/// into the child. One select loop owns all mutable state, so none of
/// it needs locking. Teardown arrives on `shutdown_rx` (or as a console
/// interrupt while the terminal is in raw mode).
pub async fn run_debug_with(
    config: ConfigSnapshot,
    mut shutdown_rx: mpsc::UnboundedReceiver<()>,
) -> Result<i32> {
    let program = child::server_binary()?;
    if !program.exists() {
        bail!(
            "debug mode requires the zerver server binary at {} (or set ZERVER_BIN)",
            program.display()
        );
    }

    let (_watcher, mut change_rx) =
        ChangeWatcher::start(&config.root).context("debug mode cannot run without its watcher")?;
    let mut debouncer = Debouncer::new(config.api_root(), Instant::now());

    // Console only when logging is on and we actually have a terminal.
    let console_active = config.logging && atty::is(atty::Stream::Stdin);
    let mut console = Console::new();
    let mut keys = if console_active {
        crossterm::terminal::enable_raw_mode()
            .context("debug console could not switch the terminal to raw mode")?;
        Some(EventStream::new())
    } else {
        None
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut handle = ChildHandle::spawn(&program, &config, true, event_tx.clone())?;

    // ShutdownFlag: monotonic, set exactly once on intentional teardown.
    let mut shutdown = false;
    // Stamp of the armed debounce check, None when no window is open.
    let mut pending_stamp: Option<Instant> = None;

    let code = loop {
        tokio::select! {
            status = handle.wait() => {
                if !should_restart(shutdown, handle.restartable()) {
                    break exit_code(status);
                }
                match respawn(&program, &config, &event_tx, &mut shutdown_rx).await {
                    Some(next) => handle = next,
                    // Shutdown was requested while retrying.
                    None => break exit_code(status),
                }
            }
            Some(path) = change_rx.recv() => {
                if let Some(stamp) = debouncer.record(path, Instant::now()) {
                    pending_stamp = Some(stamp);
                }
            }
            _ = async {
                let stamp = pending_stamp.unwrap_or_else(Instant::now);
                sleep_until(stamp + CHANGE_TIMEOUT).await;
            }, if pending_stamp.is_some() => {
                if let Some(stamp) = pending_stamp.take() {
                    match debouncer.fire(stamp) {
                        Some(ChangeAction::Restart) => {
                            emit_line(console_active, "");
                            emit_line(console_active, "reloading debug server");
                            handle.kill();
                        }
                        Some(ChangeAction::Refresh) => {
                            handle.send(&ControlMessage::debug_refresh()).await;
                        }
                        None => {}
                    }
                }
            }
            Some(event) = event_rx.recv() => {
                match event {
                    ChildEvent::Line(line) => emit_line(console_active, &line),
                    ChildEvent::Notice(notice) => {
                        if notice.prompt && console_active {
                            console.draw_prompt();
                        }
                    }
                }
            }
            key = next_key(&mut keys), if !shutdown => {
                match key {
                    Some(event) => match console.handle_key(event) {
                        ConsoleAction::Submit(line) => {
                            emit_line(console_active, "");
                            handle.send(&ControlMessage::cli(line)).await;
                        }
                        ConsoleAction::Redraw => console.draw_prompt(),
                        ConsoleAction::Interrupt => {
                            shutdown = true;
                            handle.kill();
                        }
                        ConsoleAction::Ignored => {}
                    },
                    None => {
                        // Input stream closed. Leave the terminal tidy if a
                        // prompt was showing, then shut down cleanly.
                        if console.mode() == ConsoleMode::CommandEntry {
                            emit_line(console_active, "");
                        }
                        shutdown = true;
                        handle.kill();
                    }
                }
            }
            Some(()) = shutdown_rx.recv() => {
                shutdown = true;
                handle.kill();
            }
        }
    };

    if console_active {
        let _ = crossterm::terminal::disable_raw_mode();
    }
    Ok(code)
}

/// Respawn after a child exit. A transient spawn failure (the server
/// binary can briefly vanish mid-rebuild) is retried rather than tearing
/// the session down. Returns None when shutdown is requested while
/// waiting to retry.
async fn respawn(
    program: &Path,
    config: &ConfigSnapshot,
    event_tx: &mpsc::UnboundedSender<ChildEvent>,
    shutdown_rx: &mut mpsc::UnboundedReceiver<()>,
) -> Option<ChildHandle> {
    loop {
        match ChildHandle::spawn(program, config, true, event_tx.clone()) {
            Ok(handle) => return Some(handle),
            Err(err) => {
                eprintln!("[WARNING] failed to respawn server: {err:#}");
                tokio::select! {
                    _ = sleep(RESPAWN_RETRY) => {}
                    Some(()) = shutdown_rx.recv() => return None,
                }
            }
        }
    }
}

/// Next key event from the console stream, or pend forever when the
/// console is inactive so the select branch never fires.
async fn next_key(keys: &mut Option<EventStream>) -> Option<crossterm::event::KeyEvent> {
    let Some(stream) = keys.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match stream.next().await {
            Some(Ok(Event::Key(key))) => return Some(key),
            Some(_) => continue, // Resize, mouse, or transient read error
            None => return None,
        }
    }
}

/// Print a line, using explicit CRLF while the terminal is in raw mode.
fn emit_line(raw: bool, line: &str) {
    if raw {
        let mut out = std::io::stdout();
        let _ = write!(out, "{line}\r\n");
        let _ = out.flush();
    } else {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_only_when_live_and_restartable() {
        assert!(should_restart(false, true));
        // The shutdown flag suppresses restart no matter how the child
        // exited.
        assert!(!should_restart(true, true));
        // A no-restart launch terminates the supervisor with the child.
        assert!(!should_restart(false, false));
        assert!(!should_restart(true, false));
    }

    #[cfg(unix)]
    #[test]
    fn exit_code_maps_kill_to_clean() {
        use std::os::unix::process::ExitStatusExt;
        // Signal death (no code) reads as clean shutdown.
        assert_eq!(exit_code(Ok(ExitStatus::from_raw(9))), 0);
        // A real exit code passes through: status 0x0300 is code 3.
        assert_eq!(exit_code(Ok(ExitStatus::from_raw(0x0300))), 3);
        assert_eq!(exit_code(Err(std::io::Error::other("gone"))), 0);
    }
}
