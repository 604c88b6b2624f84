#![cfg(unix)]

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::time::{Duration, sleep, timeout};
use zerver::cli::Cli;
use zerver::config::ConfigSnapshot;
use zerver::supervisor::{self, ShutdownHandle};

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh").unwrap();
    writeln!(file, "{body}").unwrap();
    drop(file);
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn runs(log: &Path) -> usize {
    std::fs::read_to_string(log)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

// ZERVER_BIN is process-global, so the whole scenario runs in one test:
// a crashing server is relaunched until shutdown, and shutdown both
// stops the loop and suppresses any further relaunch.
#[tokio::test]
async fn test_debug_mode_restarts_a_crashing_server_until_shutdown() {
    // The server script lives outside the watched root so its run log
    // does not feed the change watcher.
    let bin_dir = tempfile::tempdir().unwrap();
    let site_dir = tempfile::tempdir().unwrap();

    let log = bin_dir.path().join("runs.log");
    let server = script(
        bin_dir.path(),
        "crashing-server",
        &format!("echo run >> '{}'\nsleep 1\nexit 1", log.display()),
    );
    unsafe { std::env::set_var("ZERVER_BIN", &server) };

    let cli = Cli::try_parse_from(["zerver", "-d"]).unwrap();
    let config = ConfigSnapshot::resolve_from(&cli, None, None, site_dir.path().to_path_buf());
    assert!(config.debug);

    let (shutdown, shutdown_rx) = ShutdownHandle::new();
    let loop_task = tokio::spawn(supervisor::run_debug_with(config, shutdown_rx));

    // Each launch appends one line and crashes about a second later, so
    // more than one line means the supervisor restarted after a crash.
    sleep(Duration::from_millis(2600)).await;
    assert!(
        runs(&log) >= 2,
        "expected a crash restart, server ran {} time(s)",
        runs(&log)
    );

    shutdown.shutdown();
    let result = timeout(Duration::from_secs(5), loop_task)
        .await
        .expect("supervisor did not stop after the shutdown request")
        .unwrap();
    assert!(result.is_ok());

    // Once shut down, no further launch may happen.
    let settled = runs(&log);
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(runs(&log), settled, "server was relaunched after shutdown");

    unsafe { std::env::remove_var("ZERVER_BIN") };
}
