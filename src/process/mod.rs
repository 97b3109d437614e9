//! The process controller: assertions against one running child

mod builder;
mod input;
mod spawn;

pub use builder::{Runner, DEFAULT_REJECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};

use crate::buffer::OutputBuffer;
use crate::pattern::Expectation;
use crate::result::{Failure, Match, SpawnError};
use input::Injector;
use portable_pty::{Child, MasterPty};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// How often liveness is polled while waiting for an exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long a numeral at the end of the output must stay unchanged to match.
const NUMERAL_SETTLE: Duration = Duration::from_millis(200);

/// How long to wait for the exit status to become visible after end of output.
const EXIT_GRACE: Duration = Duration::from_millis(250);

/// Lifecycle of the child as observed by its [`Process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// The child has not terminated yet.
    Running,
    /// The child terminated on its own with this exit code.
    Exited(u32),
    /// The child was terminated through [`Process::kill`].
    Killed,
}

/// A running program under test, driven one assertion at a time.
///
/// `Process` owns the child and its terminal. All output is read through it,
/// so the consumed cursor always reflects exactly what earlier assertions
/// matched. Every assertion is bounded by a timeout: the default one from the
/// [`Runner`], or an explicit one passed to the `*_timeout` variants.
///
/// Dropping a `Process` kills the child if it is still running.
///
/// # Examples
///
/// ```no_run
/// use checkproc::{Failure, Runner};
///
/// # async fn example() -> Result<(), Failure> {
/// # let runner = Runner::new();
/// let mut process = runner.spawn("./greeter").expect("spawn failed");
///
/// process.stdin("David").await?;
/// process.stdout("hello, David\n").await?;
/// process.exit_code(0).await?;
/// # Ok(())
/// # }
/// ```
pub struct Process {
    _master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    buffer: OutputBuffer,
    injector: Injector,
    state: State,
    prompt_mark: usize,
    timeout: Duration,
    reject_timeout: Duration,
}

impl Process {
    pub(crate) fn new(
        master: Box<dyn MasterPty + Send>,
        child: Box<dyn Child + Send + Sync>,
        buffer: OutputBuffer,
        injector: Injector,
        timeout: Duration,
        reject_timeout: Duration,
    ) -> Self {
        Self {
            _master: master,
            child,
            buffer,
            injector,
            state: State::Running,
            prompt_mark: 0,
            timeout,
            reject_timeout,
        }
    }

    /// Spawn a command line with the default [`Runner`] configuration.
    ///
    /// # Errors
    ///
    /// See [`Runner::spawn`].
    pub fn spawn(command: &str) -> Result<Self, SpawnError> {
        Runner::new().spawn(command)
    }

    /// OS process id of the child, if known.
    pub fn pid(&self) -> Option<u32> {
        self.child.process_id()
    }

    /// The default timeout used by assertions without an explicit one.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current lifecycle state, refreshed from the OS.
    pub fn state(&mut self) -> State {
        self.refresh();
        self.state
    }

    /// Whether the child is still running.
    pub fn is_alive(&mut self) -> bool {
        self.state() == State::Running
    }

    /// Wait for `expected` to appear in the output, using the default timeout.
    ///
    /// See [`Process::stdout_timeout`].
    pub async fn stdout(&mut self, expected: impl Into<Expectation>) -> Result<Match, Failure> {
        let timeout = self.timeout;
        self.stdout_timeout(expected, timeout).await
    }

    /// Wait up to `timeout` for `expected` to appear in the output.
    ///
    /// The expectation may match anywhere in the unconsumed output. On success
    /// everything up to and including the match is consumed. A numeral that
    /// ends the output so far only matches once no more output has arrived for
    /// a short moment, so `2` does not match a `21` printed in two writes. Strings are
    /// regexes unless built with [`Expectation::literal`]; integers and floats
    /// match whole numerals by value.
    ///
    /// # Errors
    ///
    /// - [`Failure::Mismatch`] if the output ended without a match
    /// - [`Failure::Timeout`] if the process kept running without a match
    /// - [`Failure::ProcessDead`] if the process was killed
    /// - [`Failure::InvalidPattern`] if a regex expectation does not compile
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use checkproc::{Expectation, Runner};
    /// use std::time::Duration;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut process = Runner::new().spawn("./cash")?;
    /// process.stdin("0.41").await?;
    /// process.stdout_timeout(4, Duration::from_secs(1)).await?;
    /// process.stdout(Expectation::literal("\n")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn stdout_timeout(
        &mut self,
        expected: impl Into<Expectation>,
        timeout: Duration,
    ) -> Result<Match, Failure> {
        let expectation = expected.into();
        let matcher = expectation.to_matcher()?;
        self.ensure_not_killed()?;

        debug!(expected = %expectation.describe(), ?timeout, "checking stdout");
        let deadline = Instant::now() + timeout;

        loop {
            let pending = self.buffer.peek_all();

            if let Some(found) = matcher.find(pending) {
                // A numeral at the very end may still be growing ("2" before "21").
                if expectation.is_numeric()
                    && found.end == pending.len()
                    && !self.buffer.is_eof()
                {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    let wait = remaining.min(NUMERAL_SETTLE);
                    if !wait.is_zero()
                        && (!self.buffer.read_available(wait).await.is_empty()
                            || self.buffer.is_eof())
                    {
                        continue;
                    }
                }

                let pending = self.buffer.peek_all();
                let result = Match {
                    matched: pending[found.start..found.end].to_string(),
                    start: found.start,
                    end: found.end,
                    before: pending[..found.start].to_string(),
                    captures: found.captures,
                };
                self.buffer.consume(found.end);
                return Ok(result);
            }

            if self.buffer.is_eof() {
                let actual = pending.to_string();
                self.settle().await;
                debug!(expected = %expectation.describe(), %actual, "stdout mismatch");
                return Err(Failure::Mismatch {
                    expected: expectation.describe(),
                    actual,
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Failure::Timeout {
                    waiting_for: expectation.describe(),
                    timeout,
                    actual: non_empty(self.buffer.peek_all()),
                });
            }

            self.buffer.read_available(remaining).await;
        }
    }

    /// Wait for the output to end and return everything not yet consumed.
    ///
    /// See [`Process::output_timeout`].
    pub async fn output(&mut self) -> Result<String, Failure> {
        let timeout = self.timeout;
        self.output_timeout(timeout).await
    }

    /// Wait up to `timeout` for the output to end, then consume and return
    /// all unconsumed output.
    ///
    /// A program that printed nothing yields an empty string.
    ///
    /// # Errors
    ///
    /// - [`Failure::Timeout`] if the output is still open after `timeout`
    /// - [`Failure::ProcessDead`] if the process was killed
    pub async fn output_timeout(&mut self, timeout: Duration) -> Result<String, Failure> {
        self.ensure_not_killed()?;

        let deadline = Instant::now() + timeout;
        while !self.buffer.is_eof() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Failure::Timeout {
                    waiting_for: "end of output".to_string(),
                    timeout,
                    actual: non_empty(self.buffer.peek_all()),
                });
            }
            self.buffer.read_available(remaining).await;
        }

        self.settle().await;
        Ok(self.buffer.consume_all())
    }

    /// Wait for a prompt, then send `value` followed by a newline.
    ///
    /// See [`Process::stdin_timeout`].
    pub async fn stdin(&mut self, value: &str) -> Result<(), Failure> {
        let timeout = self.timeout;
        self.stdin_timeout(value, true, timeout).await
    }

    /// Send `value` followed by a newline without waiting for a prompt.
    pub async fn stdin_unprompted(&mut self, value: &str) -> Result<(), Failure> {
        let timeout = self.timeout;
        self.stdin_timeout(value, false, timeout).await
    }

    /// Send `value` followed by a newline, optionally waiting for a prompt.
    ///
    /// With `prompt`, any output not yet consumed and not already used as the
    /// prompt of an earlier `stdin` counts as a prompt. If none exists, waits
    /// up to `timeout` for the process to print something. The prompt is not
    /// consumed, so a later `stdout` can still check its text.
    ///
    /// A failure leaves the process running.
    ///
    /// # Errors
    ///
    /// - [`Failure::Timeout`] if no prompt appeared in time; nothing is written
    /// - [`Failure::ProcessDead`] if the process has exited or was killed
    /// - [`Failure::Io`] if writing to the terminal failed
    pub async fn stdin_timeout(
        &mut self,
        value: &str,
        prompt: bool,
        timeout: Duration,
    ) -> Result<(), Failure> {
        self.ensure_not_killed()?;

        if prompt {
            self.wait_for_prompt(timeout).await?;
        }

        if !self.is_alive() {
            return Err(Failure::dead(
                "cannot send input: the program has already exited",
            ));
        }

        debug!(value, prompt, "sending input");
        if let Err(e) = self.injector.send_line(value).await {
            if !self.is_alive() {
                return Err(Failure::dead(
                    "cannot send input: the program has already exited",
                ));
            }
            return Err(e.into());
        }

        self.prompt_mark = self.buffer.position();
        Ok(())
    }

    async fn wait_for_prompt(&mut self, timeout: Duration) -> Result<(), Failure> {
        let deadline = Instant::now() + timeout;

        loop {
            if !self.buffer.pending_since(self.prompt_mark).is_empty() {
                return Ok(());
            }

            if self.buffer.is_eof() {
                return Err(Failure::dead(
                    "expected prompt for input, but the program exited",
                ));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Failure::Timeout {
                    waiting_for: "a prompt for input".to_string(),
                    timeout,
                    actual: None,
                });
            }

            self.buffer.read_available(remaining).await;
        }
    }

    /// Wait for the process to exit and return its exit code.
    ///
    /// Returns immediately if the process already exited. A process
    /// terminated by a signal reports exit code 1, so it cannot be told apart
    /// from one that called `exit(1)`.
    ///
    /// # Errors
    ///
    /// - [`Failure::Timeout`] if the process is still running after the
    ///   default timeout; it is left running
    /// - [`Failure::ProcessDead`] if the process was killed
    pub async fn exit(&mut self) -> Result<u32, Failure> {
        let timeout = self.timeout;
        self.exit_timeout(None, timeout).await
    }

    /// Wait for the process to exit and check its exit code.
    ///
    /// # Errors
    ///
    /// Same as [`Process::exit`], plus [`Failure::Mismatch`] if the code
    /// differs from `expected`.
    pub async fn exit_code(&mut self, expected: u32) -> Result<u32, Failure> {
        let timeout = self.timeout;
        self.exit_timeout(Some(expected), timeout).await
    }

    /// Wait up to `timeout` for the process to exit, checking the code when
    /// `expected` is given.
    pub async fn exit_timeout(
        &mut self,
        expected: Option<u32>,
        timeout: Duration,
    ) -> Result<u32, Failure> {
        let code = self.wait_for_exit(timeout).await?;
        debug!(code, ?expected, "process exited");

        match expected {
            Some(expected) if expected != code => Err(Failure::Mismatch {
                expected: format!("exit code {expected}"),
                actual: code.to_string(),
            }),
            _ => Ok(code),
        }
    }

    async fn wait_for_exit(&mut self, timeout: Duration) -> Result<u32, Failure> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.state() {
                State::Exited(code) => return Ok(code),
                State::Killed => return Err(Failure::dead("the program was killed")),
                State::Running => {}
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Failure::Timeout {
                    waiting_for: "the program to exit".to_string(),
                    timeout,
                    actual: non_empty(self.buffer.peek_all()),
                });
            }

            tokio::time::sleep(remaining.min(POLL_INTERVAL)).await;
        }
    }

    /// Check that the process prints nothing and keeps running for the
    /// default reject timeout.
    ///
    /// See [`Process::reject_timeout`].
    pub async fn reject(&mut self) -> Result<(), Failure> {
        let timeout = self.reject_timeout;
        self.reject_timeout(timeout).await
    }

    /// Check that the process prints nothing and keeps running for `timeout`.
    ///
    /// Meant to follow a `stdin` whose input the program should refuse by
    /// continuing to wait. Output that is unconsumed and newer than the last
    /// prompt counts as printing.
    ///
    /// # Errors
    ///
    /// - [`Failure::UnexpectedOutput`] if output is pending or arrives
    /// - [`Failure::ProcessDead`] if the process exits, has exited, or was killed
    pub async fn reject_timeout(&mut self, timeout: Duration) -> Result<(), Failure> {
        self.ensure_not_killed()?;

        debug!(?timeout, "checking that input was rejected");
        let deadline = Instant::now() + timeout;

        loop {
            let pending = self.buffer.pending_since(self.prompt_mark);
            if !pending.is_empty() {
                return Err(Failure::UnexpectedOutput {
                    actual: pending.to_string(),
                });
            }

            if self.buffer.is_eof() {
                return Err(Failure::dead(
                    "expected program to reject input, but it exited",
                ));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            self.buffer.read_available(remaining).await;
        }

        if !self.is_alive() {
            return Err(Failure::dead(
                "expected program to reject input, but it exited",
            ));
        }

        Ok(())
    }

    /// Terminate the child and reap it.
    ///
    /// Idempotent and infallible: a child that already exited keeps its exit
    /// code, and OS errors are only logged.
    pub fn kill(&mut self) {
        self.refresh();
        if self.state != State::Running {
            return;
        }

        if let Err(e) = self.child.kill() {
            warn!(error = %e, pid = ?self.pid(), "failed to kill process");
        }
        if let Err(e) = self.child.wait() {
            warn!(error = %e, pid = ?self.pid(), "failed to reap process");
        }

        debug!(pid = ?self.pid(), "killed process");
        self.state = State::Killed;
    }

    fn refresh(&mut self) {
        if self.state != State::Running {
            return;
        }

        match spawn::try_exit_code(&mut self.child) {
            Ok(Some(code)) => self.state = State::Exited(code),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to poll process status"),
        }
    }

    /// Give an exit that coincides with end of output a moment to show up.
    async fn settle(&mut self) {
        let deadline = Instant::now() + EXIT_GRACE;
        while self.state() == State::Running && Instant::now() < deadline {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn ensure_not_killed(&self) -> Result<(), Failure> {
        if self.state == State::Killed {
            return Err(Failure::dead("the program was killed"));
        }
        Ok(())
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        self.kill();
    }
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}
