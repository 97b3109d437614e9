//! Input injection into the child's terminal

use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Writes lines to the child's input stream.
///
/// Writes run on the blocking pool: a PTY write can stall when the child is
/// not reading and the terminal's input queue is full.
pub(crate) struct Injector {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Injector {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Write `line` followed by a newline and flush.
    pub async fn send_line(&self, line: &str) -> io::Result<()> {
        let writer = self.writer.clone();
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');

        tokio::task::spawn_blocking(move || {
            let mut writer = writer.blocking_lock();
            writer.write_all(&data)?;
            writer.flush()
        })
        .await
        .map_err(io::Error::other)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct SharedSink(Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_send_line_appends_newline() {
        let sink = SharedSink::default();
        let injector = Injector::new(Box::new(sink.clone()));

        injector.send_line("foo").await.unwrap();
        injector.send_line("").await.unwrap();

        assert_eq!(sink.0.lock().unwrap().as_slice(), b"foo\n\n");
    }

    #[tokio::test]
    async fn test_send_line_reports_write_errors() {
        let injector = Injector::new(Box::new(BrokenPipe));
        let err = injector.send_line("foo").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
