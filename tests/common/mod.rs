//! Shared harness for rurl integration tests
//!
//! Spawns the compiled binary with an isolated config directory, captures
//! both output streams, and maps exit codes back to the statuses the engine
//! promises. Mock servers come from wiremock in the individual test files.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

/// Exit codes the binary commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success = 0,
    Error = 1,
    Timeout = 2,
    Interrupted = 130,
}

impl From<i32> for ExitStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => ExitStatus::Success,
            2 => ExitStatus::Timeout,
            130 => ExitStatus::Interrupted,
            _ => ExitStatus::Error,
        }
    }
}

/// Captured output of one binary invocation
#[derive(Debug)]
pub struct CliResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: ExitStatus,
    pub exit_code: i32,
}

impl CliResponse {
    /// Check if stdout contains a substring
    pub fn contains(&self, needle: &str) -> bool {
        self.stdout.contains(needle)
    }
}

impl std::fmt::Display for CliResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.stdout)
    }
}

/// Per-test environment: isolated config directory, extra environment
/// variables, an optional working directory and an optional stdin payload.
pub struct TestEnv {
    pub config_dir: TempDir,
    pub env_vars: HashMap<String, String>,
    pub current_dir: Option<PathBuf>,
    pub stdin: Option<Vec<u8>>,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        let config_dir = TempDir::new().expect("Failed to create temp config dir");
        Self {
            config_dir,
            env_vars: HashMap::new(),
            current_dir: None,
            stdin: None,
        }
    }

    pub fn set_env(mut self, key: &str, value: &str) -> Self {
        self.env_vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Run the binary with this directory as its working directory.
    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Pipe this payload into the binary's stdin.
    pub fn set_stdin(mut self, content: &[u8]) -> Self {
        self.stdin = Some(content.to_vec());
        self
    }
}

/// Run rurl with the given arguments and a fresh environment.
pub fn rurl(args: &[&str]) -> CliResponse {
    rurl_with_env(args, &TestEnv::new())
}

/// Run rurl from the given working directory.
pub fn rurl_in(dir: &Path, args: &[&str]) -> CliResponse {
    rurl_with_env(args, &TestEnv::new().in_dir(dir))
}

/// Run rurl with full environment control.
pub fn rurl_with_env(args: &[&str], env: &TestEnv) -> CliResponse {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rurl"));

    // A wedged test dies at the inactivity deadline instead of hanging the
    // suite; a later -t in `args` wins.
    cmd.args(["-t", "10s"]);
    cmd.args(args);

    cmd.env("RURL_CONFIG_DIR", env.config_dir.path());
    for (key, value) in &env.env_vars {
        cmd.env(key, value);
    }
    if let Some(dir) = &env.current_dir {
        cmd.current_dir(dir);
    }

    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let output = if let Some(stdin_data) = &env.stdin {
        cmd.stdin(Stdio::piped());
        let mut child = cmd.spawn().expect("Failed to spawn rurl");
        {
            let stdin = child.stdin.as_mut().expect("Failed to open stdin");
            stdin.write_all(stdin_data).expect("Failed to write to stdin");
        }
        child.wait_with_output().expect("Failed to wait for rurl")
    } else {
        cmd.stdin(Stdio::null());
        cmd.output().expect("Failed to execute rurl")
    };

    parse_output(output)
}

fn parse_output(output: Output) -> CliResponse {
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(1);

    CliResponse {
        stdout,
        stderr,
        exit_status: ExitStatus::from(exit_code),
        exit_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_from_code() {
        assert_eq!(ExitStatus::from(0), ExitStatus::Success);
        assert_eq!(ExitStatus::from(1), ExitStatus::Error);
        assert_eq!(ExitStatus::from(2), ExitStatus::Timeout);
        assert_eq!(ExitStatus::from(130), ExitStatus::Interrupted);
        assert_eq!(ExitStatus::from(42), ExitStatus::Error);
    }
}
