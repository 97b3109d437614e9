//! Runner: configuration and spawning of checked processes

use crate::buffer::{spawn_reader, OutputBuffer};
use crate::process::input::Injector;
use crate::process::spawn::spawn_on_pty;
use crate::process::Process;
use crate::result::SpawnError;
use portable_pty::{CommandBuilder, PtySize};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default timeout for `stdout`, `stdin`, `output` and `exit` (in seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 3;

/// Default window `reject` listens for output (in seconds)
pub const DEFAULT_REJECT_TIMEOUT_SECS: u64 = 1;

/// Default PTY rows
const DEFAULT_PTY_ROWS: u16 = 24;

/// Default PTY columns
const DEFAULT_PTY_COLS: u16 = 80;

/// Builder for configuring and spawning checked processes.
///
/// All configuration is explicit: nothing is read from ambient global state
/// besides the current directory, which is the working directory when none
/// is set.
///
/// # Defaults
///
/// - Timeout: 3 seconds
/// - Reject timeout: 1 second
/// - PTY size: 24 rows × 80 columns
/// - Working directory: the caller's current directory
///
/// # Examples
///
/// ```no_run
/// use checkproc::Runner;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let runner = Runner::new()
///     .cwd("/tmp/submission")
///     .env("LANG", "C.UTF-8")
///     .timeout(Duration::from_secs(10));
///
/// let first = runner.spawn("./mario")?;
/// let second = runner.spawn_program("./mario", ["--height", "3"])?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Runner {
    cwd: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
    timeout: Duration,
    reject_timeout: Duration,
    rows: u16,
    cols: u16,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Create a runner with default configuration.
    ///
    /// See the [`Runner`] documentation for default values.
    pub fn new() -> Self {
        Self {
            cwd: None,
            env: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            reject_timeout: Duration::from_secs(DEFAULT_REJECT_TIMEOUT_SECS),
            rows: DEFAULT_PTY_ROWS,
            cols: DEFAULT_PTY_COLS,
        }
    }

    /// Set the working directory of spawned processes.
    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set an environment variable for spawned processes.
    ///
    /// The rest of the caller's environment is inherited.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Set the default timeout of the spawned [`Process`].
    ///
    /// Used by `stdout`, `output`, `stdin` and `exit` unless a call passes
    /// its own.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how long `reject` listens for output by default.
    pub fn reject_timeout(mut self, timeout: Duration) -> Self {
        self.reject_timeout = timeout;
        self
    }

    /// Set PTY (terminal) size.
    pub fn pty_size(mut self, rows: u16, cols: u16) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    /// Run a command line through the system shell.
    ///
    /// On Unix this is `sh -c <command>`, on Windows `cmd /C <command>`, so
    /// quoting, pipes and redirections behave as they would in a terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The command line is empty
    /// - The PTY cannot be created
    /// - The process cannot be spawned
    pub fn spawn(&self, command: &str) -> Result<Process, SpawnError> {
        if command.trim().is_empty() {
            return Err(SpawnError::EmptyCommand);
        }

        let mut cmd = if cfg!(windows) {
            let mut cmd = CommandBuilder::new("cmd");
            cmd.arg("/C");
            cmd
        } else {
            let mut cmd = CommandBuilder::new("sh");
            cmd.arg("-c");
            cmd
        };
        cmd.arg(command);

        self.launch(cmd, command)
    }

    /// Run a program directly with the given arguments, without a shell.
    ///
    /// # Errors
    ///
    /// Same as [`Runner::spawn`].
    pub fn spawn_program<I, S>(&self, program: &str, args: I) -> Result<Process, SpawnError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        if program.trim().is_empty() {
            return Err(SpawnError::EmptyCommand);
        }

        let mut cmd = CommandBuilder::new(program);
        for arg in args {
            cmd.arg(arg);
        }

        self.launch(cmd, program)
    }

    fn launch(&self, mut cmd: CommandBuilder, command_line: &str) -> Result<Process, SpawnError> {
        // portable-pty falls back to the home directory otherwise.
        let cwd = match &self.cwd {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(|e| SpawnError::Spawn(e.to_string()))?,
        };
        cmd.cwd(cwd);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let size = PtySize {
            rows: self.rows,
            cols: self.cols,
            pixel_width: 0,
            pixel_height: 0,
        };
        let spawned = spawn_on_pty(cmd, size)?;
        let rx = spawn_reader(spawned.reader).map_err(|e| SpawnError::Spawn(e.to_string()))?;

        let process = Process::new(
            spawned.master,
            spawned.child,
            OutputBuffer::new(rx),
            Injector::new(spawned.writer),
            self.timeout,
            self.reject_timeout,
        );

        tracing::info!(command = command_line, pid = ?process.pid(), "spawned process");

        Ok(process)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let runner = Runner::new();
        assert_eq!(runner.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(
            runner.reject_timeout,
            Duration::from_secs(DEFAULT_REJECT_TIMEOUT_SECS)
        );
        assert_eq!((runner.rows, runner.cols), (24, 80));
        assert!(runner.cwd.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let runner = Runner::new()
            .cwd("/tmp")
            .env("FOO", "bar")
            .timeout(Duration::from_millis(500))
            .reject_timeout(Duration::from_millis(100))
            .pty_size(40, 120);

        assert_eq!(runner.cwd.as_deref(), Some(Path::new("/tmp")));
        assert_eq!(
            runner.env,
            vec![(OsString::from("FOO"), OsString::from("bar"))]
        );
        assert_eq!(runner.timeout, Duration::from_millis(500));
        assert_eq!(runner.reject_timeout, Duration::from_millis(100));
        assert_eq!((runner.rows, runner.cols), (40, 120));
    }

    #[cfg(unix)]
    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_spawn_is_logged() {
        let mut process = Runner::new().spawn("true").unwrap();
        assert!(logs_contain("spawned process"));

        process.output().await.unwrap();
    }

    #[test]
    fn test_empty_command() {
        assert!(matches!(
            Runner::new().spawn("   "),
            Err(SpawnError::EmptyCommand)
        ));
        assert!(matches!(
            Runner::new().spawn_program("", ["x"]),
            Err(SpawnError::EmptyCommand)
        ));
    }
}
