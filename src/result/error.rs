//! Error types for checkproc

use std::time::Duration;
use thiserror::Error;

/// The category a [`Failure`] belongs to.
///
/// Check scripts usually only need the rendered message, but tests and report
/// layers can branch on the kind without matching every variant's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Nothing qualifying happened within the time bound.
    Timeout,
    /// Output or an exit code was observed but did not satisfy the expectation.
    Mismatch,
    /// The operation needs a live process, but it has exited or was killed.
    ProcessDead,
    /// Silence was required but the process printed something.
    UnexpectedOutput,
    /// The check itself is broken (bad regex) or the PTY failed underneath.
    Internal,
}

/// A failed assertion against a child process.
///
/// Every [`Process`](crate::Process) assertion returns `Result<_, Failure>`.
/// Use `?` to abort a check at the first failure, or inspect the error to keep
/// interacting. A failure never moves the consumed cursor, so the process can
/// still be driven or killed afterwards.
///
/// # Examples
///
/// ```no_run
/// use checkproc::{Failure, FailureKind, Runner};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut process = Runner::new().spawn("./hello")?;
///
/// match process.stdout("hello, world\n").await {
///     Ok(_) => {}
///     Err(failure) if failure.kind() == FailureKind::Timeout => {
///         eprintln!("program hung: {failure}");
///     }
///     Err(failure) => return Err(failure.into()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum Failure {
    /// The deadline passed while the process was still running.
    #[error("timed out after {timeout:?} while waiting for {waiting_for}")]
    Timeout {
        /// What the assertion was waiting for.
        waiting_for: String,
        /// The bound that expired.
        timeout: Duration,
        /// Unconsumed output seen before giving up, if any.
        actual: Option<String>,
    },

    /// The observed output or exit code did not satisfy the expectation.
    #[error("expected {expected}, not {actual:?}")]
    Mismatch {
        /// Description of what was expected.
        expected: String,
        /// What was actually observed.
        actual: String,
    },

    /// The process is no longer running.
    #[error("{reason}")]
    ProcessDead {
        /// Why the operation could not proceed.
        reason: String,
    },

    /// The process printed something while it should have been waiting.
    #[error("expected program to reject input, but it printed {actual:?}")]
    UnexpectedOutput {
        /// The output that arrived.
        actual: String,
    },

    /// The expectation was a regex that does not compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Reading from or writing to the PTY failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Failure {
    pub(crate) fn dead(reason: impl Into<String>) -> Self {
        Failure::ProcessDead {
            reason: reason.into(),
        }
    }

    /// The category of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::Timeout { .. } => FailureKind::Timeout,
            Failure::Mismatch { .. } => FailureKind::Mismatch,
            Failure::ProcessDead { .. } => FailureKind::ProcessDead,
            Failure::UnexpectedOutput { .. } => FailureKind::UnexpectedOutput,
            Failure::InvalidPattern(_) | Failure::Io(_) => FailureKind::Internal,
        }
    }

    /// The evidence that was observed when the assertion failed, if any.
    pub fn actual(&self) -> Option<&str> {
        match self {
            Failure::Timeout { actual, .. } => actual.as_deref(),
            Failure::Mismatch { actual, .. } | Failure::UnexpectedOutput { actual } => {
                Some(actual)
            }
            _ => None,
        }
    }
}

/// Errors raised while starting a child process.
#[derive(Error, Debug)]
pub enum SpawnError {
    /// The command line was empty.
    #[error("command cannot be empty")]
    EmptyCommand,

    /// The pseudo-terminal could not be created or configured.
    #[error("PTY error: {0}")]
    Pty(String),

    /// The command could not be started.
    #[error("failed to spawn process: {0}")]
    Spawn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let timeout = Failure::Timeout {
            waiting_for: "\"foo\"".into(),
            timeout: Duration::from_secs(1),
            actual: None,
        };
        assert_eq!(timeout.kind(), FailureKind::Timeout);
        assert_eq!(Failure::dead("gone").kind(), FailureKind::ProcessDead);
        assert_eq!(
            Failure::Io(std::io::Error::other("boom")).kind(),
            FailureKind::Internal
        );
    }

    #[test]
    fn test_actual_evidence() {
        let mismatch = Failure::Mismatch {
            expected: "exit code 0".into(),
            actual: "1".into(),
        };
        assert_eq!(mismatch.actual(), Some("1"));

        let timeout = Failure::Timeout {
            waiting_for: "exit".into(),
            timeout: Duration::from_millis(10),
            actual: Some("partial".into()),
        };
        assert_eq!(timeout.actual(), Some("partial"));
        assert_eq!(Failure::dead("gone").actual(), None);
    }

    #[test]
    fn test_display() {
        let failure = Failure::UnexpectedOutput {
            actual: "oops\n".into(),
        };
        assert_eq!(
            failure.to_string(),
            "expected program to reject input, but it printed \"oops\\n\""
        );
        assert_eq!(Failure::dead("process was killed").to_string(), "process was killed");
    }
}
