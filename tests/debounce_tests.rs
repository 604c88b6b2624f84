use std::path::PathBuf;

use tokio::time::{Duration, Instant};
use zerver::debounce::{ChangeAction, Debouncer, WATCH_GRACE};

fn api_root() -> PathBuf {
    PathBuf::from("/home/dev/site/zerver")
}

#[test]
fn test_rapid_burst_produces_one_action_keyed_to_last_event() {
    let start = Instant::now();
    let mut debouncer = Debouncer::new(api_root(), start);

    let mut stamps = Vec::new();
    for i in 0..5 {
        let at = start + WATCH_GRACE + Duration::from_millis(i * 100);
        stamps.push(debouncer.record(PathBuf::from("/home/dev/site/zerver/api.js"), at));
    }

    // Checks for every superseded stamp are no-ops.
    for stamp in &stamps[..4] {
        assert_eq!(debouncer.fire(stamp.unwrap()), None);
    }
    assert_eq!(
        debouncer.fire(stamps[4].unwrap()),
        Some(ChangeAction::Restart)
    );
    assert!(!debouncer.has_pending());
}

#[test]
fn test_server_source_change_kills_never_refreshes() {
    let start = Instant::now();
    let mut debouncer = Debouncer::new(api_root(), start);
    let at = start + WATCH_GRACE;
    let stamp = debouncer
        .record(PathBuf::from("/home/dev/site/zerver/handlers.js"), at)
        .unwrap();
    assert_eq!(debouncer.fire(stamp), Some(ChangeAction::Restart));
}

#[test]
fn test_asset_change_refreshes_never_kills() {
    let start = Instant::now();
    let mut debouncer = Debouncer::new(api_root(), start);
    let at = start + WATCH_GRACE;
    let stamp = debouncer
        .record(PathBuf::from("/home/dev/site/public/index.html"), at)
        .unwrap();
    assert_eq!(debouncer.fire(stamp), Some(ChangeAction::Refresh));
}

#[test]
fn test_grace_period_suppresses_classification() {
    let start = Instant::now();
    let mut debouncer = Debouncer::new(api_root(), start);
    assert_eq!(
        debouncer.record(PathBuf::from("/home/dev/site/zerver/api.js"), start),
        None
    );
    assert!(!debouncer.has_pending());
}

#[test]
fn test_mixed_burst_classifies_only_the_final_path() {
    let start = Instant::now();
    let mut debouncer = Debouncer::new(api_root(), start);

    let first = debouncer
        .record(
            PathBuf::from("/home/dev/site/zerver/api.js"),
            start + WATCH_GRACE,
        )
        .unwrap();
    let second = debouncer
        .record(
            PathBuf::from("/home/dev/site/public/app.css"),
            start + WATCH_GRACE + Duration::from_millis(200),
        )
        .unwrap();

    assert_eq!(debouncer.fire(first), None);
    assert_eq!(debouncer.fire(second), Some(ChangeAction::Refresh));
}
