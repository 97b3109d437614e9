//! PTY reader thread

use bytes::Bytes;
use std::io::{self, Read};
use std::thread;
use tokio::sync::mpsc;

const READ_CHUNK_SIZE: usize = 4096;

/// Pump everything `reader` yields into a channel from a dedicated thread.
///
/// The channel closes when the reader reports end of stream or an error. On
/// Linux a PTY master reports `EIO` once the child side is gone, which is the
/// normal way this thread ends.
pub fn spawn_reader(mut reader: Box<dyn Read + Send>) -> io::Result<mpsc::UnboundedReceiver<Bytes>> {
    let (tx, rx) = mpsc::unbounded_channel();

    thread::Builder::new()
        .name("checkproc-pty-reader".to_string())
        .spawn(move || {
            let mut buf = [0u8; READ_CHUNK_SIZE];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(Bytes::copy_from_slice(&buf[..n])).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        tracing::trace!(error = %e, "PTY reader stopped");
                        break;
                    }
                }
            }
        })?;

    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forwards_all_data_then_closes() {
        let data = b"first line\nsecond line\n".repeat(500);
        let mut rx = spawn_reader(Box::new(io::Cursor::new(data.clone()))).unwrap();

        let mut received = Vec::new();
        while let Some(chunk) = rx.recv().await {
            received.extend_from_slice(&chunk);
        }

        assert_eq!(received, data);
    }

    #[tokio::test]
    async fn test_closes_on_empty_reader() {
        let mut rx = spawn_reader(Box::new(io::empty())).unwrap();
        assert!(rx.recv().await.is_none());
    }
}
