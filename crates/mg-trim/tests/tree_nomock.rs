//! No-mock trim pass over a realistic must-gather layout.

use chrono::{TimeDelta, TimeZone, Utc};
use mg_trim::{BackupLedger, Classifier, RunClock, TreeTrimmer, TrimPolicy};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn clock() -> RunClock {
    RunClock::fixed(Utc.with_ymd_and_hms(2026, 1, 2, 0, 30, 0).unwrap())
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Build a tree with a node journal spanning new year, a pod log, a resource
/// dump and a compressed archive.
fn build_tree(root: &Path) {
    let journal: String = (0..120)
        .map(|i| {
            let ts = Utc.with_ymd_and_hms(2026, 1, 1, 22, 31, 0).unwrap() + TimeDelta::minutes(i);
            format!("{} worker-0 kubenswrapper[2211]: tick {}\n", ts.format("%b %d %H:%M:%S"), i)
        })
        .collect();
    let journal = format!(
        "Dec 31 23:59:00 worker-0 systemd[1]: old year\n{}",
        journal
    );
    write(root, "registry/nodes/worker-0/journal_kubelet", &journal);

    let pod: String = (0..90)
        .map(|i| {
            let ts = Utc.with_ymd_and_hms(2026, 1, 1, 23, 0, 0).unwrap() + TimeDelta::minutes(i);
            format!("{} {{\"msg\":\"reconcile {}\"}}\n", ts.format("%Y-%m-%dT%H:%M:%S%.9fZ"), i)
        })
        .collect();
    write(
        root,
        "registry/namespaces/openshift-cnv/pods/virt-handler-abc/virt-handler/virt-handler/logs/current.log",
        &pod,
    );

    let yaml: String = (0..500).map(|i| format!("key{}: value\n", i)).collect();
    write(root, "registry/cluster-scoped-resources/core/nodes.yaml", &yaml);
    write(root, "registry/nodes/worker-0/sos.tar.gz", "\u{1f}\u{8b} not really gzip");
}

#[test]
fn test_time_window_pass_then_restore() {
    let dir = TempDir::new().unwrap();
    build_tree(dir.path());
    let before = snapshot(dir.path());

    let classifier = Classifier::with_defaults(clock()).unwrap();
    let policy = TrimPolicy {
        max_lines: 100,
        window: Some(TimeDelta::minutes(60)),
    };
    let mut ledger = BackupLedger::new(dir.path());
    let report = TreeTrimmer::new(&classifier, policy, clock())
        .trim_tree(dir.path(), &mut ledger)
        .unwrap();

    assert_eq!(report.files_seen, 4);
    assert_eq!(report.ignored, 1);
    assert!(report.failures.is_empty(), "{:?}", report.failures);

    let kept = |suffix: &str| {
        report
            .trimmed
            .iter()
            .find(|t| t.relative.ends_with(suffix))
            .map(|t| t.kept_lines)
    };
    // Journal ticks run 22:31 .. 00:30; 23:30 onward is within the hour.
    assert_eq!(kept("journal_kubelet"), Some(61));
    // Pod ticks run 23:00 .. 00:29; 23:30 onward is within the hour.
    assert_eq!(kept("current.log"), Some(60));
    assert_eq!(kept("nodes.yaml"), Some(100));

    ledger.restore_all().unwrap();
    assert_eq!(snapshot(dir.path()), before);
}

fn snapshot(root: &Path) -> Vec<(String, Vec<u8>)> {
    mg_trim::walk_tree(root, &|_| false)
        .unwrap()
        .into_iter()
        .filter(|e| !e.is_dir)
        .map(|e| (e.relative, fs::read(&e.path).unwrap()))
        .collect()
}

#[cfg(unix)]
#[test]
fn test_symlink_target_outside_tree_is_never_trimmed() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("gather-files");
    fs::create_dir_all(&root).unwrap();
    let outside = dir.path().join("outside.log");
    let lines: String = (1..=50).map(|i| format!("line {}\n", i)).collect();
    fs::write(&outside, &lines).unwrap();
    std::os::unix::fs::symlink(&outside, root.join("link.log")).unwrap();

    let policy = TrimPolicy {
        max_lines: 10,
        window: None,
    };
    let mut ledger = BackupLedger::new(&root);
    let report = TreeTrimmer::new(&Classifier::new(), policy, clock())
        .trim_tree(&root, &mut ledger)
        .unwrap();

    assert_eq!(report.files_seen, 1);
    assert_eq!(report.ignored, 1);
    assert!(report.trimmed.is_empty());
    assert!(ledger.is_empty());
    assert_eq!(fs::read_to_string(&outside).unwrap(), lines);

    ledger.restore_all().unwrap();
    assert!(fs::symlink_metadata(root.join("link.log"))
        .unwrap()
        .file_type()
        .is_symlink());
}
