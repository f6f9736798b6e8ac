//! CLI error handling tests for mg-attach.
//!
//! These tests verify that invalid arguments and configuration produce
//! appropriate error messages and exit codes before any work starts.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the mg-attach binary with a clean environment.
fn mg_attach(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mg-attach").expect("mg-attach binary should exist");
    cmd.current_dir(home.path())
        .env_remove("BUGZILLA_API_KEY")
        .env_remove("MG_CONFIG")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", home.path().join("xdg"));
    cmd
}

// ============================================================================
// Argument Tests
// ============================================================================

mod arguments {
    use super::*;

    #[test]
    fn missing_bug_id_is_args_error() {
        let home = TempDir::new().unwrap();
        mg_attach(&home)
            .assert()
            .code(10)
            .stderr(predicate::str::contains("BUG_ID"));
    }

    #[test]
    fn zero_bug_id_is_args_error() {
        let home = TempDir::new().unwrap();
        mg_attach(&home).arg("0").assert().code(10);
    }

    #[test]
    fn non_numeric_bug_id_is_args_error() {
        let home = TempDir::new().unwrap();
        mg_attach(&home)
            .arg("bz123")
            .assert()
            .code(10)
            .stderr(predicate::str::contains("invalid value"));
    }

    #[test]
    fn unknown_flag_is_args_error() {
        let home = TempDir::new().unwrap();
        mg_attach(&home)
            .args(["1", "--nonexistent-flag"])
            .assert()
            .code(10);
    }

    #[test]
    fn bad_log_format_is_args_error() {
        let home = TempDir::new().unwrap();
        mg_attach(&home)
            .args(["1", "--log-format", "xml"])
            .assert()
            .code(10);
    }

    #[test]
    fn help_succeeds() {
        let home = TempDir::new().unwrap();
        mg_attach(&home)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--api-key"))
            .stdout(predicate::str::contains("--since"));
    }

    #[test]
    fn version_succeeds() {
        let home = TempDir::new().unwrap();
        mg_attach(&home)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("mg-attach"));
    }
}

// ============================================================================
// Configuration Tests
// ============================================================================

mod configuration {
    use super::*;

    #[test]
    fn missing_config_file_is_config_error() {
        let home = TempDir::new().unwrap();
        mg_attach(&home)
            .args(["1", "--no-upload", "--config", "does-not-exist.json"])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn invalid_json_is_config_error() {
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join("bad.json"), "{not json").unwrap();
        mg_attach(&home)
            .args(["1", "--no-upload", "--config", "bad.json"])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("Invalid JSON"));
    }

    #[test]
    fn zero_max_lines_is_config_error() {
        let home = TempDir::new().unwrap();
        mg_attach(&home)
            .args(["1", "--no-upload", "--max-lines", "0"])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("max_lines"));
    }

    #[test]
    fn bad_since_is_config_error() {
        let home = TempDir::new().unwrap();
        mg_attach(&home)
            .args(["1", "--no-upload", "--since", "3 weeks"])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("invalid duration"));
    }

    #[test]
    fn mg_config_env_must_exist() {
        let home = TempDir::new().unwrap();
        mg_attach(&home)
            .env("MG_CONFIG", home.path().join("gone.json"))
            .args(["1", "--no-upload"])
            .assert()
            .code(11);
    }

    #[test]
    fn missing_from_dir_is_args_error() {
        let home = TempDir::new().unwrap();
        mg_attach(&home)
            .args(["1", "--no-upload", "--from-dir", "nowhere"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("not a directory"));
    }

    #[test]
    fn dest_dir_at_or_above_work_dir_is_config_error() {
        let home = TempDir::new().unwrap();
        let precious = home.path().join("precious.txt");
        std::fs::write(&precious, "keep me").unwrap();

        for dest in [".", "..", "../elsewhere", "/"] {
            mg_attach(&home)
                .args(["1", "--no-upload", "--dest-dir", dest])
                .assert()
                .code(11)
                .stderr(predicate::str::contains("dest_dir"));
        }
        assert!(precious.exists());
    }

    #[test]
    fn empty_dest_dir_in_config_is_config_error() {
        let home = TempDir::new().unwrap();
        let precious = home.path().join("precious.txt");
        std::fs::write(&precious, "keep me").unwrap();
        std::fs::write(
            home.path().join("config.json"),
            r#"{"dest_dir": "", "collector": "/bin/true"}"#,
        )
        .unwrap();

        mg_attach(&home)
            .args(["1", "--no-upload", "--config", "config.json"])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("dest_dir"));
        assert!(precious.exists());
    }
}
