//! Diagnostic tree traversal, classification and per-file trimming.

use crate::line_count::LineCountTrimmer;
use crate::time_window::TimeWindowTrimmer;
use crate::timestamp::PatternTimestampParser;
use crate::{BackupLedger, Result, RunClock, TimestampFamily, TrimError, DEFAULT_MAX_LINES};
use chrono::TimeDelta;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default rules: node journals and container logs.
pub const DEFAULT_NODE_PATH_PATTERN: &str = r"(^|/)nodes/[^/]+/.*(journal|kubelet|crio)[^/]*$";
pub const DEFAULT_POD_PATH_PATTERN: &str = r"(^|/)pods/.+/(current|previous)\.log$";

/// Paths never trimmed by default (compressed or binary payloads).
pub const DEFAULT_IGNORE_PATTERNS: &[&str] =
    &[r"\.(gz|tgz|zip|xz|bz2|tar|png|jpe?g|pcap|db|bin)$"];

/// One entry of a tree walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: PathBuf,
    /// Path relative to the walked root, `/`-separated.
    pub relative: String,
    pub is_dir: bool,
    /// Symbolic links are recorded, never followed.
    pub is_symlink: bool,
}

/// Walk `root` depth-first in lexicographic order.
///
/// Directories are listed before their contents. Entries rejected by
/// `exclude` are skipped together with everything beneath them.
pub fn walk_tree(root: &Path, exclude: &dyn Fn(&Path) -> bool) -> std::io::Result<Vec<TreeEntry>> {
    let mut out = Vec::new();
    walk_dir(root, root, exclude, &mut out)?;
    Ok(out)
}

fn walk_dir(
    root: &Path,
    dir: &Path,
    exclude: &dyn Fn(&Path) -> bool,
    out: &mut Vec<TreeEntry>,
) -> std::io::Result<()> {
    let mut children: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    children.sort();

    for path in children {
        if exclude(&path) {
            debug!(path = %path.display(), "Excluded from walk");
            continue;
        }
        let relative = relative_path(root, &path);
        let file_type = fs::symlink_metadata(&path)?.file_type();
        let is_dir = file_type.is_dir();
        out.push(TreeEntry {
            path: path.clone(),
            relative,
            is_dir,
            is_symlink: file_type.is_symlink(),
        });
        if is_dir {
            walk_dir(root, &path, exclude, out)?;
        }
    }
    Ok(())
}

fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// How a file is treated by the trim phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    /// Never trimmed.
    Ignored,
    /// Trimmed by line count.
    LineCount,
    /// Trimmed by time window when a window is configured, using the parser
    /// of the matching rule.
    TimeWindow { family: TimestampFamily, rule: usize },
}

/// A file discovered in the tree and its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub path: PathBuf,
    pub relative: String,
    pub class: FileClass,
}

/// A path pattern selecting files that carry timestamps of one family.
#[derive(Debug, Clone)]
pub struct TimestampRule {
    path_pattern: Regex,
    parser: PatternTimestampParser,
}

impl TimestampRule {
    pub fn new(path_pattern: &str, parser: PatternTimestampParser) -> Result<Self> {
        let path_pattern = Regex::new(path_pattern).map_err(|source| TrimError::Rule {
            pattern: path_pattern.to_string(),
            source,
        })?;
        Ok(Self {
            path_pattern,
            parser,
        })
    }

    pub fn parser(&self) -> &PatternTimestampParser {
        &self.parser
    }
}

/// Ordered classification rules. The first ignore or timestamp match wins.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    ignore: Vec<Regex>,
    rules: Vec<TimestampRule>,
}

impl Classifier {
    /// Classifier with no rules: every file is line-count trimmed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier with the built-in node, pod and ignore rules.
    pub fn with_defaults(clock: RunClock) -> Result<Self> {
        let mut classifier = Self::new();
        for pattern in DEFAULT_IGNORE_PATTERNS {
            classifier = classifier.ignore(pattern)?;
        }
        Ok(classifier
            .rule(TimestampRule::new(
                DEFAULT_NODE_PATH_PATTERN,
                PatternTimestampParser::for_family(TimestampFamily::Node, clock),
            )?)
            .rule(TimestampRule::new(
                DEFAULT_POD_PATH_PATTERN,
                PatternTimestampParser::for_family(TimestampFamily::Pod, clock),
            )?))
    }

    /// Add a path pattern that is never trimmed.
    pub fn ignore(mut self, pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern).map_err(|source| TrimError::Rule {
            pattern: pattern.to_string(),
            source,
        })?;
        self.ignore.push(re);
        Ok(self)
    }

    /// Append a timestamp rule.
    pub fn rule(mut self, rule: TimestampRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[TimestampRule] {
        &self.rules
    }

    /// Classify a `/`-separated path relative to the tree root.
    pub fn classify(&self, relative: &str) -> FileClass {
        if self.ignore.iter().any(|re| re.is_match(relative)) {
            return FileClass::Ignored;
        }
        self.rules
            .iter()
            .position(|r| r.path_pattern.is_match(relative))
            .map(|rule| FileClass::TimeWindow {
                family: self.rules[rule].parser.family(),
                rule,
            })
            .unwrap_or(FileClass::LineCount)
    }

    /// Discover and classify every non-directory entry under `root`.
    ///
    /// Symlinks are classed [`FileClass::Ignored`]: trimming through a link
    /// would mutate its target, possibly outside the tree.
    pub fn discover(
        &self,
        root: &Path,
        exclude: &dyn Fn(&Path) -> bool,
    ) -> std::io::Result<Vec<LogFile>> {
        Ok(walk_tree(root, exclude)?
            .into_iter()
            .filter(|e| !e.is_dir)
            .map(|e| LogFile {
                class: if e.is_symlink {
                    FileClass::Ignored
                } else {
                    self.classify(&e.relative)
                },
                path: e.path,
                relative: e.relative,
            })
            .collect())
    }
}

/// Trim limits for one run.
#[derive(Debug, Clone, Copy)]
pub struct TrimPolicy {
    /// Line cap for line-count trimming.
    pub max_lines: usize,
    /// Trailing time window for timestamped files; `None` disables
    /// time-window trimming and every eligible file is line-count trimmed.
    pub window: Option<TimeDelta>,
}

impl Default for TrimPolicy {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            window: None,
        }
    }
}

/// Result of trimming one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimOutcome {
    Unchanged {
        lines: usize,
    },
    Trimmed {
        original_lines: usize,
        kept_lines: usize,
    },
}

/// A file that was trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTrim {
    pub relative: String,
    pub original_lines: usize,
    pub kept_lines: usize,
}

/// A file whose trim failed and was left as collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub relative: String,
    pub error: String,
}

/// Summary of a trim pass over a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrimReport {
    pub files_seen: usize,
    pub ignored: usize,
    pub trimmed: Vec<FileTrim>,
    pub failures: Vec<FileFailure>,
}

/// Applies the matching trimmer to every file of a tree.
pub struct TreeTrimmer<'c> {
    classifier: &'c Classifier,
    policy: TrimPolicy,
    clock: RunClock,
}

impl<'c> TreeTrimmer<'c> {
    pub fn new(classifier: &'c Classifier, policy: TrimPolicy, clock: RunClock) -> Self {
        Self {
            classifier,
            policy,
            clock,
        }
    }

    /// Trim one classified file.
    pub fn trim_file(&self, file: &LogFile, ledger: &mut BackupLedger) -> Result<TrimOutcome> {
        match (file.class, self.policy.window) {
            (FileClass::Ignored, _) => Ok(TrimOutcome::Unchanged { lines: 0 }),
            (FileClass::TimeWindow { rule, .. }, Some(window)) => {
                let parser = self.classifier.rules[rule].parser();
                TimeWindowTrimmer::new(parser, self.clock, window).trim(&file.path, ledger)
            }
            _ => LineCountTrimmer::new(self.policy.max_lines).trim(&file.path, ledger),
        }
    }

    /// Trim every file under `root`.
    ///
    /// A failure on one file is logged and recorded in the report; the pass
    /// continues with the next file. Only a failure to walk the tree itself is
    /// returned as an error.
    pub fn trim_tree(&self, root: &Path, ledger: &mut BackupLedger) -> Result<TrimReport> {
        let files = {
            let owned = |p: &Path| ledger.owns(p);
            self.classifier
                .discover(root, &owned)
                .map_err(|e| TrimError::io(root, e))?
        };

        let mut report = TrimReport {
            files_seen: files.len(),
            ..TrimReport::default()
        };

        for file in &files {
            if file.class == FileClass::Ignored {
                report.ignored += 1;
                continue;
            }
            match self.trim_file(file, ledger) {
                Ok(TrimOutcome::Trimmed {
                    original_lines,
                    kept_lines,
                }) => {
                    info!(
                        path = %file.relative,
                        original_lines,
                        kept_lines,
                        "Trimmed file"
                    );
                    report.trimmed.push(FileTrim {
                        relative: file.relative.clone(),
                        original_lines,
                        kept_lines,
                    });
                }
                Ok(TrimOutcome::Unchanged { .. }) => {}
                Err(e) => {
                    warn!(path = %file.relative, error = %e, "Trim failed, file left as collected");
                    report.failures.push(FileFailure {
                        relative: file.relative.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn clock() -> RunClock {
        RunClock::fixed(Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_classify_defaults() {
        let c = Classifier::with_defaults(clock()).unwrap();

        assert!(matches!(
            c.classify("quay-io-kubevirt/nodes/worker-0/journal_kubelet"),
            FileClass::TimeWindow {
                family: TimestampFamily::Node,
                ..
            }
        ));
        assert!(matches!(
            c.classify("ns/openshift-cnv/pods/virt-handler-x/virt-handler/virt-handler/logs/current.log"),
            FileClass::TimeWindow {
                family: TimestampFamily::Pod,
                ..
            }
        ));
        assert_eq!(c.classify("cluster-scoped-resources/nodes.yaml"), FileClass::LineCount);
        assert_eq!(c.classify("nodes/worker-0/sosreport.tar.gz"), FileClass::Ignored);
    }

    #[test]
    fn test_walk_is_sorted_and_excludes() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b/inner")).unwrap();
        fs::create_dir_all(dir.path().join("skip")).unwrap();
        fs::write(dir.path().join("b/inner/z.log"), "z").unwrap();
        fs::write(dir.path().join("a.log"), "a").unwrap();
        fs::write(dir.path().join("skip/hidden.log"), "h").unwrap();

        let skip = dir.path().join("skip");
        let entries = walk_tree(dir.path(), &|p: &Path| p == skip).unwrap();
        let rel: Vec<&str> = entries.iter().map(|e| e.relative.as_str()).collect();

        assert_eq!(rel, vec!["a.log", "b", "b/inner", "b/inner/z.log"]);
        assert!(entries[1].is_dir);
        assert!(!entries[3].is_dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("real.log"), "r").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.log"), dir.path().join("link.log"))
            .unwrap();

        let files = Classifier::new().discover(dir.path(), &|_| false).unwrap();
        let classes: Vec<(&str, FileClass)> =
            files.iter().map(|f| (f.relative.as_str(), f.class)).collect();
        assert_eq!(
            classes,
            vec![("link.log", FileClass::Ignored), ("real.log", FileClass::LineCount)]
        );
    }

    #[test]
    fn test_trim_tree_contains_failures() {
        let dir = TempDir::new().unwrap();
        let big: String = (0..50).map(|i| format!("{}\n", i)).collect();
        fs::write(dir.path().join("big.log"), &big).unwrap();
        fs::write(dir.path().join("small.log"), "1\n2\n").unwrap();
        // Not UTF-8: reading as text fails.
        fs::write(dir.path().join("raw.dat"), [0xffu8; 64]).unwrap();

        let classifier = Classifier::new();
        let policy = TrimPolicy {
            max_lines: 10,
            window: None,
        };
        let mut ledger = BackupLedger::new(dir.path());
        let report = TreeTrimmer::new(&classifier, policy, clock())
            .trim_tree(dir.path(), &mut ledger)
            .unwrap();

        assert_eq!(report.files_seen, 3);
        assert_eq!(report.trimmed.len(), 1);
        assert_eq!(report.trimmed[0].relative, "big.log");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].relative, "raw.dat");
        assert_eq!(ledger.len(), 1);

        ledger.restore_all().unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("big.log")).unwrap(), big);
    }

    #[test]
    fn test_timestamp_files_fall_back_to_line_count_without_window() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("pods/p/c/c/logs");
        fs::create_dir_all(&logs).unwrap();
        let content: String = (0..20)
            .map(|i| format!("2026-10-14T11:{:02}:00.000000000Z msg\n", i))
            .collect();
        fs::write(logs.join("current.log"), &content).unwrap();

        let classifier = Classifier::with_defaults(clock()).unwrap();
        let policy = TrimPolicy {
            max_lines: 5,
            window: None,
        };
        let mut ledger = BackupLedger::new(dir.path());
        let report = TreeTrimmer::new(&classifier, policy, clock())
            .trim_tree(dir.path(), &mut ledger)
            .unwrap();

        assert_eq!(report.trimmed[0].kept_lines, 5);
        let trimmed = fs::read_to_string(logs.join("current.log")).unwrap();
        assert!(trimmed.starts_with("File trimmed to last 5 lines\n"));
    }

    #[test]
    fn test_timestamp_files_use_window() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("pods/p/c/c/logs");
        fs::create_dir_all(&logs).unwrap();
        let content: String = (0..60)
            .map(|i| format!("2026-10-14T11:{:02}:00.000000000Z msg {}\n", i, i))
            .collect();
        fs::write(logs.join("current.log"), &content).unwrap();
        // Not timestamped: line-count rules apply even with a window.
        let yaml: String = (0..30).map(|i| format!("k{}: v\n", i)).collect();
        fs::write(dir.path().join("nodes.yaml"), &yaml).unwrap();

        let classifier = Classifier::with_defaults(clock()).unwrap();
        let policy = TrimPolicy {
            max_lines: 10,
            window: Some(TimeDelta::minutes(15)),
        };
        let mut ledger = BackupLedger::new(dir.path());
        let report = TreeTrimmer::new(&classifier, policy, clock())
            .trim_tree(dir.path(), &mut ledger)
            .unwrap();

        let by_name = |name: &str| report.trimmed.iter().find(|t| t.relative.ends_with(name)).unwrap();
        // 11:45 .. 11:59 are within 15 minutes of 12:00.
        assert_eq!(by_name("current.log").kept_lines, 15);
        assert_eq!(by_name("nodes.yaml").kept_lines, 10);
        assert_eq!(ledger.len(), 2);
        ledger.restore_all().unwrap();
    }

    #[test]
    fn test_staging_not_walked_during_trim() {
        let dir = TempDir::new().unwrap();
        let big: String = (0..50).map(|i| format!("{}\n", i)).collect();
        fs::write(dir.path().join("a.log"), &big).unwrap();
        fs::write(dir.path().join("b.log"), &big).unwrap();

        let classifier = Classifier::new();
        let policy = TrimPolicy {
            max_lines: 10,
            window: None,
        };
        let mut ledger = BackupLedger::new(dir.path());
        // Stage something up front so the staging directory exists during the walk.
        ledger.backup(&dir.path().join("a.log")).unwrap();

        let report = TreeTrimmer::new(&classifier, policy, clock())
            .trim_tree(dir.path(), &mut ledger)
            .unwrap();

        assert_eq!(report.files_seen, 2);
        assert_eq!(ledger.len(), 2);
        ledger.restore_all().unwrap();
    }
}
