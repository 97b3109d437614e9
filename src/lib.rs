//! checkproc: step-by-step verification of interactive programs
//!
//! checkproc runs a program under test on a pseudo-terminal and lets a
//! grading check assert on the conversation with it, one step at a time:
//! what it printed, whether it asked for input, what was typed back, and how
//! it terminated. Every step is bounded by a timeout and reports a
//! [`Failure`] that says what was expected and what was actually seen.
//!
//! # Features
//!
//! - **Skip-ahead matching**: expectations match anywhere in the output not
//!   yet consumed by earlier steps
//! - **Regex, literal and numeric expectations**: `1` matches `a1b` but not
//!   `21`, `1.0` or `-1`
//! - **Prompt detection**: `stdin` waits until the program prints something
//!   before typing
//! - **Rejection checks**: `reject` verifies that a program ignored bad input
//!   and kept waiting
//! - **Async/await**: built on tokio
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use checkproc::Runner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut process = Runner::new()
//!         .cwd("submission")
//!         .timeout(Duration::from_secs(5))
//!         .spawn("./mario")?;
//!
//!     // Negative heights must be refused with another prompt
//!     process.stdin("-1").await?;
//!     process.stdout("Height: ").await?;
//!     process.stdout("Height: ").await?;
//!     process.reject().await?;
//!
//!     // The fresh prompt was consumed above, so type without waiting for one
//!     process.stdin_unprompted("2").await?;
//!     process.stdout(" #\n##\n").await?;
//!     process.exit_code(0).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Expectations
//!
//! Anything that converts into an [`Expectation`] can be passed to
//! [`Process::stdout`]:
//!
//! ```rust,no_run
//! use checkproc::{Expectation, Process};
//! use std::fs::File;
//!
//! # async fn example(process: &mut Process) -> Result<(), Box<dyn std::error::Error>> {
//! // Regex (the default for strings)
//! process.stdout(r"Change owed: \d+").await?;
//!
//! // Verbatim text
//! process.stdout(Expectation::literal("$1.00 (rounded)")).await?;
//!
//! // Numbers, compared by value
//! process.stdout(4).await?;
//! process.stdout(0.5).await?;
//!
//! // Reference output from a file
//! let expected = Expectation::from_reader(File::open("expected.txt")?)?.regex(false);
//! process.stdout(expected).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Handling failures
//!
//! `?` ends a check at the first failure. To keep going, match on the
//! [`FailureKind`]:
//!
//! ```rust,no_run
//! use checkproc::{FailureKind, Process};
//!
//! # async fn example(process: &mut Process) {
//! if let Err(failure) = process.stdout("Goodbye").await {
//!     match failure.kind() {
//!         FailureKind::Timeout => process.kill(),
//!         _ => eprintln!(":( {failure}"),
//!     }
//! }
//! # }
//! ```

#![warn(missing_docs)]

mod buffer;
mod pattern;
mod process;
mod result;

// Public API exports
pub use pattern::{Expectation, Expected};
pub use process::{Process, Runner, State};
pub use result::{Failure, FailureKind, Match, SpawnError};

// Default configuration values
pub use process::{DEFAULT_REJECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};
