use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

pub const TRAIN_BIN: &str = env!("CARGO_BIN_EXE_ransomguard-train");
pub const PREDICT_BIN: &str = env!("CARGO_BIN_EXE_ransomguard-predict");
pub const SCAN_BIN: &str = env!("CARGO_BIN_EXE_ransomguard-scan");

/// Scratch working directory with its own application directory for logs and config.
pub struct Workspace {
    temp: TempDir,
    config_home: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("create tempdir");
        let config_home = temp.path().join(".config-home");
        std::fs::create_dir_all(&config_home).expect("create config home");
        Self { temp, config_home }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Run `bin` inside the workspace with a clean ransomguard environment.
    pub fn run(&self, bin: &str, args: &[&str]) -> Output {
        self.command(bin, args).output().expect("spawn binary")
    }

    pub fn command(&self, bin: &str, args: &[&str]) -> Command {
        let mut command = Command::new(bin);
        command
            .args(args)
            .current_dir(self.temp.path())
            .env("RANSOMGUARD_CONFIG_HOME", &self.config_home)
            .env_remove("RANSOMGUARD_CONFIG")
            .env_remove("RANSOMGUARD_MODEL")
            .env_remove("RANSOMGUARD_DATASET")
            .env_remove("RUST_LOG");
        command
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Parse the single JSON line a predictor or scanner prints.
pub fn json_line(output: &Output) -> serde_json::Value {
    let text = stdout(output);
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let line = lines.next().expect("json line on stdout");
    assert!(lines.next().is_none(), "expected exactly one line, got {text:?}");
    serde_json::from_str(line).expect("stdout is valid JSON")
}
