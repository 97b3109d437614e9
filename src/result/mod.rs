//! Result types for process assertions

mod error;

pub use error::{Failure, FailureKind, SpawnError};

/// Result of a successful [`stdout`](crate::Process::stdout) assertion.
///
/// Offsets are byte offsets into the output that was still unconsumed when the
/// assertion started. Everything in `before` and `matched` has been consumed.
///
/// # Examples
///
/// ```no_run
/// use checkproc::Runner;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut process = Runner::new().spawn("echo 'total: 42'")?;
/// let result = process.stdout(r"total: (\d+)").await?;
///
/// assert_eq!(result.captures[1], "42");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// The matched text.
    pub matched: String,

    /// Start of the match, relative to the unconsumed output.
    pub start: usize,

    /// End of the match, relative to the unconsumed output.
    pub end: usize,

    /// Unconsumed output that preceded the match and was skipped over.
    pub before: String,

    /// Captured groups for regex expectations.
    ///
    /// Index 0 is the full match. Empty for literal and numeric expectations.
    pub captures: Vec<String>,
}
