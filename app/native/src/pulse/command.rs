//! Locating and running the PulseAudio command line tools.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Output;

use crate::error::SwitcherError;

/// Resolve the absolute path to an executable binary.
///
/// Absolute paths are only checked for being executable. Otherwise the
/// binary is searched in:
/// 1. Any directory in the `AUTODUPLEX_EXTRA_PATHS` env var (colon-separated).
/// 2. The current process `PATH`.
/// 3. The usual system and per-user binary directories.
///
/// # Errors
///
/// Returns a descriptive reason when no executable is found.
pub fn resolve_binary(binary: &str) -> Result<PathBuf, String> {
    if binary.is_empty() {
        return Err("Binary name cannot be empty".to_string());
    }

    let candidate = Path::new(binary);
    if candidate.is_absolute() {
        return if is_executable(candidate) {
            Ok(candidate.to_path_buf())
        } else {
            Err(format!("Binary at {} is not executable", candidate.display()))
        };
    }

    let mut search_paths = Vec::new();

    if let Ok(extra) = env::var("AUTODUPLEX_EXTRA_PATHS") {
        search_paths.extend(extra.split(':').map(PathBuf::from));
    }

    if let Some(path_var) = env::var_os("PATH") {
        search_paths.extend(env::split_paths(&path_var));
    }

    search_paths.extend([
        PathBuf::from("/usr/local/bin"),
        PathBuf::from("/usr/bin"),
        PathBuf::from("/bin"),
    ]);

    if let Some(home) = env::var_os("HOME").map(PathBuf::from) {
        search_paths.push(home.join(".local/bin"));
    }

    search_paths
        .into_iter()
        .filter(|directory| !directory.as_os_str().is_empty())
        .map(|directory| directory.join(binary))
        .find(|path| is_executable(path))
        .ok_or_else(|| format!("Unable to locate executable '{binary}' in known search paths"))
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .is_ok_and(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
}

/// A resolved command line tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    name: String,
    path: PathBuf,
}

impl Tool {
    /// Locates `binary`.
    ///
    /// # Errors
    ///
    /// Returns [`SwitcherError::Command`] if the binary cannot be found.
    pub fn locate(binary: &str) -> Result<Self, SwitcherError> {
        let path = resolve_binary(binary).map_err(|reason| SwitcherError::command(binary, reason))?;
        let name = path
            .file_name()
            .map_or_else(|| binary.to_string(), |name| name.to_string_lossy().into_owned());
        Ok(Self { name, path })
    }

    /// Absolute path of the binary.
    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    fn describe(&self, args: &[&str]) -> String {
        let mut line = self.name.clone();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    fn check(&self, args: &[&str], output: Output) -> Result<String, SwitcherError> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(SwitcherError::command(self.describe(args), message));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Runs the tool to completion and returns its standard output.
    ///
    /// Output is requested in the C locale so it can be parsed.
    ///
    /// # Errors
    ///
    /// Returns [`SwitcherError::Command`] if the tool cannot be started or
    /// exits unsuccessfully.
    pub fn run(&self, args: &[&str]) -> Result<String, SwitcherError> {
        tracing::trace!(command = %self.describe(args), "running");
        let output = std::process::Command::new(&self.path)
            .args(args)
            .env("LC_ALL", "C")
            .output()
            .map_err(|err| SwitcherError::command(self.describe(args), err))?;
        self.check(args, output)
    }

    /// Like [`Tool::run`], without blocking the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SwitcherError::Command`] if the tool cannot be started or
    /// exits unsuccessfully.
    pub async fn run_async(&self, args: &[&str]) -> Result<String, SwitcherError> {
        let output = self
            .async_command()
            .args(args)
            .output()
            .await
            .map_err(|err| SwitcherError::command(self.describe(args), err))?;
        self.check(args, output)
    }

    /// Returns an async command for the tool, set up like [`Tool::run`].
    #[must_use]
    pub fn async_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.path);
        command.env("LC_ALL", "C");
        command
    }
}
