//! Grading a greeter program
//!
//! Runs the program given on the command line (or a built-in sample
//! submission) through a few checks and prints a pass/fail report.
//!
//! ```text
//! cargo run --example grade_greeter -- "python3 hello.py"
//! ```

use anyhow::Result;
use checkproc::{Failure, Runner};
use std::time::Duration;

const SAMPLE_SUBMISSION: &str = r#"
while true; do
    printf 'What is your name? '
    read name
    [ -n "$name" ] && break
done
printf 'hello, %s\n' "$name"
"#;

async fn greets_by_name(runner: &Runner, command: &str) -> Result<(), Failure> {
    let mut process = runner.spawn(command).map_err(std::io::Error::other)?;
    process.stdin("David").await?;
    process.stdout("hello, David\n").await?;
    process.exit_code(0).await?;
    Ok(())
}

async fn rejects_empty_name(runner: &Runner, command: &str) -> Result<(), Failure> {
    let mut process = runner.spawn(command).map_err(std::io::Error::other)?;
    process.stdin("").await?;
    // a fresh prompt is fine, anything else is not
    process.stdout("What is your name\\? ").await?;
    process.stdout("What is your name\\? ").await?;
    process.reject().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let command = std::env::args()
        .nth(1)
        .unwrap_or_else(|| SAMPLE_SUBMISSION.to_string());

    let runner = Runner::new().timeout(Duration::from_secs(2));

    println!("checkproc - Greeter Check");
    println!("{}", "=".repeat(50));

    let results = [
        ("greets the user by name", greets_by_name(&runner, &command).await),
        ("re-prompts on an empty name", rejects_empty_name(&runner, &command).await),
    ];

    let mut failed = 0;
    for (name, result) in &results {
        match result {
            Ok(()) => println!(":) {name}"),
            Err(failure) => {
                failed += 1;
                println!(":( {name}");
                println!("    {failure}");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} checks failed", results.len());
    }

    Ok(())
}
