// src/scriptlet/mod.rs

//! Post-install hook execution
//!
//! A hook is the `.pkginfo/post-install` script shipped inside an artifact.
//! The engine only cares about its pass/fail outcome: a failing hook is
//! logged and recorded on the package, never rolled back.
//!
//! - stdin is nulled so a script cannot hang waiting for input
//! - execution is bounded by a timeout, after which the child is killed
//! - stdout lines are logged at info, stderr lines at warn

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// Default timeout for hook execution
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const INTERPRETERS: [&str; 2] = ["/bin/bash", "/bin/sh"];

/// Environment handed to a hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookEnv {
    pub package_name: String,
    pub package_version: String,
    /// Top directory of the package inside the install area
    pub install_prefix: PathBuf,
    /// Root of the install area
    pub root: PathBuf,
}

impl HookEnv {
    pub fn vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("SITEPKG_PACKAGE_NAME", self.package_name.clone()),
            ("SITEPKG_PACKAGE_VERSION", self.package_version.clone()),
            (
                "SITEPKG_INSTALL_PREFIX",
                self.install_prefix.to_string_lossy().into_owned(),
            ),
            ("SITEPKG_ROOT", self.root.to_string_lossy().into_owned()),
        ]
    }
}

/// Runs post-install hooks
pub trait HookRunner {
    /// Run `script`; any failure (spawn, non-zero exit, timeout) is a
    /// [`Error::PostHookError`]
    fn run(&self, script: &str, env: &HookEnv) -> Result<()>;
}

/// Runs hooks through a system shell
#[derive(Debug, Clone)]
pub struct ShellHookRunner {
    timeout: Duration,
    interpreter: Option<PathBuf>,
}

impl Default for ShellHookRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellHookRunner {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interpreter: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn interpreter(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.interpreter {
            return if path.exists() {
                Ok(path.clone())
            } else {
                Err(Error::PostHookError(format!(
                    "Interpreter not found: {}",
                    path.display()
                )))
            };
        }
        INTERPRETERS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
            .ok_or_else(|| Error::PostHookError("No shell available to run hook".to_string()))
    }

    fn prepare_script(temp_dir: &Path, content: &str) -> Result<PathBuf> {
        let script_path = temp_dir.join("post-install.sh");

        let mut file = File::create(&script_path)?;
        file.write_all(content.as_bytes())?;

        let mut perms = fs::metadata(&script_path)?.permissions();
        perms.set_mode(0o700);
        fs::set_permissions(&script_path, perms)?;

        Ok(script_path)
    }
}

impl HookRunner for ShellHookRunner {
    fn run(&self, script: &str, env: &HookEnv) -> Result<()> {
        let interpreter = self.interpreter()?;

        info!(
            "Running post-install hook for {} {}",
            env.package_name, env.package_version
        );

        let temp_dir = TempDir::new()?;
        let script_path = Self::prepare_script(temp_dir.path(), script)?;
        debug!(
            "Executing hook: {} {}",
            interpreter.display(),
            script_path.display()
        );

        let working_dir = if env.install_prefix.is_dir() {
            env.install_prefix.as_path()
        } else {
            env.root.as_path()
        };

        let mut child = Command::new(&interpreter)
            .arg(&script_path)
            .envs(env.vars())
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::PostHookError(format!("Failed to spawn hook: {}", e)))?;

        // drain both pipes while waiting, a chatty hook would block otherwise
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        match child.wait_timeout(self.timeout)? {
            Some(status) => {
                for line in collect(stdout).lines() {
                    info!("[{}] {}", env.package_name, line);
                }
                for line in collect(stderr).lines() {
                    warn!("[{}] {}", env.package_name, line);
                }

                if status.success() {
                    Ok(())
                } else {
                    Err(Error::PostHookError(format!(
                        "hook of {} exited with code {}",
                        env.package_name,
                        status.code().unwrap_or(-1)
                    )))
                }
            }
            None => {
                // readers are left to finish once the pipes close
                if let Err(e) = child.kill() {
                    debug!("Could not kill hook of {}: {}", env.package_name, e);
                }
                let _ = child.wait();
                Err(Error::PostHookError(format!(
                    "hook of {} timed out after {} seconds",
                    env.package_name,
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

/// Read a child pipe to its end on a helper thread
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf) {
            debug!("Reading hook output failed: {}", e);
        }
        buf
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(root: &Path) -> HookEnv {
        HookEnv {
            package_name: "gaudi".to_string(),
            package_version: "28.1".to_string(),
            install_prefix: root.join("lhcb/gaudi"),
            root: root.to_path_buf(),
        }
    }

    #[test]
    fn test_hook_sees_environment() {
        let root = tempfile::tempdir().unwrap();
        let env = env(root.path());
        fs::create_dir_all(&env.install_prefix).unwrap();

        let script = "echo \"$SITEPKG_PACKAGE_NAME $SITEPKG_PACKAGE_VERSION\" > \"$SITEPKG_INSTALL_PREFIX/stamp\"\n";
        ShellHookRunner::new().run(script, &env).unwrap();

        let stamp = fs::read_to_string(env.install_prefix.join("stamp")).unwrap();
        assert_eq!(stamp.trim(), "gaudi 28.1");
    }

    #[test]
    fn test_failing_hook() {
        let root = tempfile::tempdir().unwrap();
        let result = ShellHookRunner::new().run("exit 3\n", &env(root.path()));
        match result {
            Err(Error::PostHookError(msg)) => assert!(msg.contains("code 3")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_hook_timeout() {
        let root = tempfile::tempdir().unwrap();
        let runner = ShellHookRunner::new().with_timeout(Duration::from_millis(200));
        let result = runner.run("sleep 5\n", &env(root.path()));
        assert!(matches!(result, Err(Error::PostHookError(msg)) if msg.contains("timed out")));
    }

    #[test]
    fn test_verbose_hook_is_not_blocked_by_its_output() {
        let root = tempfile::tempdir().unwrap();
        let runner = ShellHookRunner::new().with_timeout(Duration::from_secs(10));
        let script = "head -c 200000 /dev/zero | tr '\\0' a\nhead -c 200000 /dev/zero | tr '\\0' b >&2\nexit 0\n";

        let started = std::time::Instant::now();
        runner.run(script, &env(root.path())).unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_missing_interpreter() {
        let root = tempfile::tempdir().unwrap();
        let runner = ShellHookRunner::new().with_interpreter("/nonexistent/shell");
        assert!(matches!(
            runner.run("true\n", &env(root.path())),
            Err(Error::PostHookError(_))
        ));
    }
}
