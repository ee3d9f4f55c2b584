//! Test environment builder for isolated edgepush runs.
//!
//! Every `TestEnv` owns a temp project directory holding `edgepush.toml`,
//! the site source (`public/`), the store root (`remote/`) and the CDN
//! journal (`journal/`). The user config layer points at an empty temp dir.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use edgepush::infrastructure::cdn::{Journal, JournalCdn};

pub const NAMESPACE: &str = "site";
pub const DISTRIBUTION: &str = "E2EDIST";

/// Environment variables that would leak the developer's setup into tests
const SCRUBBED_ENV: &[&str] = &[
    "EDGEPUSH_LOG",
    "EDGEPUSH_SOURCE",
    "EDGEPUSH_NAMESPACE",
    "EDGEPUSH_DISTRIBUTION",
    "EDGEPUSH_PRUNE",
    "EDGEPUSH_CONCURRENCY",
    "EDGEPUSH_RUN_DEADLINE_SECS",
    "EDGEPUSH_STORE_BACKEND",
    "EDGEPUSH_STORE_ROOT",
    "EDGEPUSH_CDN_BACKEND",
    "EDGEPUSH_CDN_JOURNAL_DIR",
    "EDGEPUSH_COLOR",
    "CI",
];

const BASE_CONFIG: &str = r#"[deploy]
source = "public"
namespace = "site"
distribution = "E2EDIST"
wildcard_threshold = 1.0

[sync]
initial_backoff_ms = 1
max_backoff_ms = 10

[store]
backend = "local"
root = "remote"

[cdn]
backend = "journal"
journal_dir = "journal"
poll_interval_ms = 50
"#;

/// Result of running the edgepush binary
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// Parse stdout as NDJSON.
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                serde_json::from_str(l)
                    .unwrap_or_else(|e| panic!("not JSON ({e}): {l}\nstdout:\n{}", self.stdout))
            })
            .collect()
    }
}

/// Isolated project directory plus an empty user config home
pub struct TestEnv {
    pub project_root: TempDir,
    pub config_home: TempDir,
    bin: PathBuf,
}

impl TestEnv {
    /// Project configured for the local store and journal CDN.
    pub fn new() -> Self {
        let env = Self::bare();
        env.write_config(BASE_CONFIG);
        env
    }

    /// Project without an `edgepush.toml`.
    pub fn bare() -> Self {
        let env = Self {
            project_root: TempDir::new().expect("create project dir"),
            config_home: TempDir::new().expect("create config home"),
            bin: PathBuf::from(env!("CARGO_BIN_EXE_edgepush")),
        };
        fs::create_dir_all(env.source_dir()).expect("create source dir");
        env
    }

    pub fn root(&self) -> &Path {
        self.project_root.path()
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root().join("public")
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.root().join("edgepush.toml"), content).expect("write config");
    }

    /// Rewrite the base config, e.g. to add a key to an existing table.
    pub fn edit_config(&self, edit: impl FnOnce(&str) -> String) {
        self.write_config(&edit(BASE_CONFIG));
    }

    pub fn write_source(&self, rel: &str, content: &str) {
        let path = self.source_dir().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create source subdir");
        }
        fs::write(path, content).expect("write source file");
    }

    pub fn remove_source(&self, rel: &str) {
        fs::remove_file(self.source_dir().join(rel)).expect("remove source file");
    }

    fn namespace_dir(&self) -> PathBuf {
        self.root().join("remote").join(NAMESPACE)
    }

    /// Content of a published object.
    pub fn remote_file(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.namespace_dir().join(key)).ok()
    }

    /// Every published key, sorted.
    pub fn remote_keys(&self) -> Vec<String> {
        fn walk(dir: &Path, prefix: &str, out: &mut Vec<String>) {
            let Ok(entries) = fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                let key = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}/{name}")
                };
                if entry.path().is_dir() {
                    walk(&entry.path(), &key, out);
                } else {
                    out.push(key);
                }
            }
        }

        let mut keys = Vec::new();
        walk(&self.namespace_dir(), "", &mut keys);
        keys.sort();
        keys
    }

    /// Invalidation journal of the test distribution.
    pub fn journal(&self) -> Journal {
        JournalCdn::new(self.root().join("journal"))
            .load(DISTRIBUTION)
            .expect("load journal")
    }

    pub fn state_file(&self) -> PathBuf {
        self.root().join(".edgepush").join("state.json")
    }

    pub fn run(&self, args: &[&str]) -> TestResult {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], env_vars: &[(&str, &str)]) -> TestResult {
        let mut cmd = Command::new(&self.bin);
        cmd.current_dir(self.root())
            .args(args)
            .env("EDGEPUSH_CONFIG_HOME", self.config_home.path())
            .env("NO_COLOR", "1")
            .env("TERM", "dumb");
        for var in SCRUBBED_ENV {
            cmd.env_remove(var);
        }
        for (key, value) in env_vars {
            cmd.env(key, value);
        }

        let output = cmd.output().expect("failed to execute edgepush");
        TestResult {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Replace the project path in `text` so output is stable across runs.
    pub fn redact(&self, text: &str) -> String {
        let mut redacted = text.to_string();
        if let Ok(canonical) = self.root().canonicalize() {
            redacted = redacted.replace(&canonical.display().to_string(), "[ROOT]");
        }
        redacted.replace(&self.root().display().to_string(), "[ROOT]")
    }
}
