//! Buffer management for process output

mod reader;

pub use reader::spawn_reader;

use bytes::{Buf, Bytes, BytesMut};
use std::time::Duration;
use tokio::sync::mpsc;

/// Consumed text beyond this many bytes is dropped from memory.
const COMPACT_THRESHOLD: usize = 8192;

/// Growing window over a child's output with a consumed cursor.
///
/// Raw chunks arrive over a channel. They are decoded as UTF-8 incrementally
/// (a sequence split across chunks is held back, invalid bytes become U+FFFD)
/// and `\r\n` is normalized to `\n`. Positions returned by [`position`] and
/// [`cursor`] are logical offsets that stay valid across compaction.
///
/// [`position`]: OutputBuffer::position
/// [`cursor`]: OutputBuffer::cursor
pub struct OutputBuffer {
    rx: mpsc::UnboundedReceiver<Bytes>,
    raw: BytesMut,
    text: String,
    cursor: usize,
    offset: usize,
    eof: bool,
}

impl OutputBuffer {
    /// Create a buffer fed by `rx`; the stream ends when the channel closes.
    pub fn new(rx: mpsc::UnboundedReceiver<Bytes>) -> Self {
        Self {
            rx,
            raw: BytesMut::new(),
            text: String::new(),
            cursor: 0,
            offset: 0,
            eof: false,
        }
    }

    /// Wait up to `timeout` for output and return the newly decoded text.
    ///
    /// Returns an empty string if nothing arrived in time. Returns immediately
    /// once the stream has ended. Chunks already queued behind the first one
    /// are taken too, without waiting.
    pub async fn read_available(&mut self, timeout: Duration) -> String {
        if self.eof {
            return String::new();
        }

        let start = self.text.len();

        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Err(_) => return String::new(),
            Ok(None) => self.finish(),
            Ok(Some(chunk)) => {
                self.append(&chunk);
                loop {
                    match self.rx.try_recv() {
                        Ok(chunk) => self.append(&chunk),
                        Err(mpsc::error::TryRecvError::Empty) => break,
                        Err(mpsc::error::TryRecvError::Disconnected) => {
                            self.finish();
                            break;
                        }
                    }
                }
            }
        }

        self.text[start..].to_string()
    }

    /// All text that has not been consumed yet.
    pub fn peek_all(&self) -> &str {
        &self.text[self.cursor..]
    }

    /// Unconsumed text that lies past the logical position `mark`.
    pub fn pending_since(&self, mark: usize) -> &str {
        let from = mark.saturating_sub(self.offset).max(self.cursor);
        &self.text[from.min(self.text.len())..]
    }

    /// Advance the cursor past `n` bytes of unconsumed text.
    ///
    /// `n` must fall on a char boundary of [`peek_all`](Self::peek_all), which
    /// match offsets always do. It is clamped to the unconsumed length.
    pub fn consume(&mut self, n: usize) {
        self.cursor = (self.cursor + n).min(self.text.len());

        if self.cursor > COMPACT_THRESHOLD {
            self.text.drain(..self.cursor);
            self.offset += self.cursor;
            self.cursor = 0;
        }
    }

    /// Consume and return everything unconsumed.
    pub fn consume_all(&mut self) -> String {
        let rest = self.peek_all().to_string();
        self.consume(rest.len());
        rest
    }

    /// Whether the stream has ended. Buffered text may still be unconsumed.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Logical offset of the end of the decoded output.
    pub fn position(&self) -> usize {
        self.offset + self.text.len()
    }

    /// Logical offset of the consumed cursor.
    pub fn cursor(&self) -> usize {
        self.offset + self.cursor
    }

    fn append(&mut self, data: &[u8]) {
        self.raw.extend_from_slice(data);
        self.decode(false);
    }

    fn finish(&mut self) {
        self.eof = true;
        self.decode(true);
    }

    fn decode(&mut self, flush: bool) {
        loop {
            let (valid, invalid) = match std::str::from_utf8(&self.raw) {
                // A trailing '\r' may be the first half of a "\r\n" pair.
                Ok(s) => (s.len() - usize::from(!flush && s.ends_with('\r')), 0),
                Err(e) => {
                    let invalid = match e.error_len() {
                        Some(len) => len,
                        None if flush => self.raw.len() - e.valid_up_to(),
                        None => 0,
                    };
                    (e.valid_up_to(), invalid)
                }
            };

            let decoded = String::from_utf8_lossy(&self.raw[..valid]).replace("\r\n", "\n");
            self.text.push_str(&decoded);
            self.raw.advance(valid);

            if invalid == 0 {
                break;
            }
            self.text.push(char::REPLACEMENT_CHARACTER);
            self.raw.advance(invalid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(20);

    fn buffer() -> (mpsc::UnboundedSender<Bytes>, OutputBuffer) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, OutputBuffer::new(rx))
    }

    fn send(tx: &mpsc::UnboundedSender<Bytes>, data: &'static [u8]) {
        tx.send(Bytes::from_static(data)).unwrap();
    }

    #[tokio::test]
    async fn test_read_available() {
        let (tx, mut buffer) = buffer();
        send(&tx, b"Hello ");
        send(&tx, b"World");

        assert_eq!(buffer.read_available(SHORT).await, "Hello World");
        assert_eq!(buffer.peek_all(), "Hello World");
        assert!(!buffer.is_eof());
    }

    #[tokio::test]
    async fn test_read_available_timeout_is_empty() {
        let (_tx, mut buffer) = buffer();
        assert_eq!(buffer.read_available(SHORT).await, "");
        assert!(!buffer.is_eof());
    }

    #[tokio::test]
    async fn test_eof_returns_immediately() {
        let (tx, mut buffer) = buffer();
        send(&tx, b"bye\n");
        drop(tx);

        let started = std::time::Instant::now();
        assert_eq!(buffer.read_available(Duration::from_secs(10)).await, "bye\n");
        assert!(buffer.is_eof());
        assert_eq!(buffer.read_available(Duration::from_secs(10)).await, "");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_consume() {
        let (tx, mut buffer) = buffer();
        send(&tx, b"foo\nbar\n");
        buffer.read_available(SHORT).await;

        buffer.consume(4);
        assert_eq!(buffer.peek_all(), "bar\n");
        assert_eq!(buffer.cursor(), 4);

        buffer.consume(100);
        assert_eq!(buffer.peek_all(), "");
        assert_eq!(buffer.cursor(), 8);
    }

    #[tokio::test]
    async fn test_consume_all() {
        let (tx, mut buffer) = buffer();
        send(&tx, b"abc");
        buffer.read_available(SHORT).await;
        buffer.consume(1);

        assert_eq!(buffer.consume_all(), "bc");
        assert_eq!(buffer.consume_all(), "");
    }

    #[tokio::test]
    async fn test_crlf_normalized() {
        let (tx, mut buffer) = buffer();
        send(&tx, b"one\r\ntwo\r");
        send(&tx, b"\nthree\r");
        buffer.read_available(SHORT).await;

        assert_eq!(buffer.peek_all(), "one\ntwo\nthree");

        drop(tx);
        buffer.read_available(SHORT).await;
        assert_eq!(buffer.peek_all(), "one\ntwo\nthree\r");
    }

    #[tokio::test]
    async fn test_crlf_split_across_reads() {
        let (tx, mut buffer) = buffer();
        send(&tx, b"foo\r");
        assert_eq!(buffer.read_available(SHORT).await, "foo");

        send(&tx, b"\nbar");
        assert_eq!(buffer.read_available(SHORT).await, "\nbar");
        assert_eq!(buffer.peek_all(), "foo\nbar");
    }

    #[tokio::test]
    async fn test_utf8_split_across_chunks() {
        let (tx, mut buffer) = buffer();
        let bytes = "世界".as_bytes();
        tx.send(Bytes::copy_from_slice(&bytes[..2])).unwrap();
        assert_eq!(buffer.read_available(SHORT).await, "");

        tx.send(Bytes::copy_from_slice(&bytes[2..])).unwrap();
        assert_eq!(buffer.read_available(SHORT).await, "世界");
    }

    #[tokio::test]
    async fn test_invalid_utf8_replaced() {
        let (tx, mut buffer) = buffer();
        send(&tx, b"ok\xFFok");
        buffer.read_available(SHORT).await;
        assert_eq!(buffer.peek_all(), "ok\u{FFFD}ok");
    }

    #[tokio::test]
    async fn test_incomplete_utf8_flushed_at_eof() {
        let (tx, mut buffer) = buffer();
        send(&tx, b"end\xE4");
        drop(tx);
        buffer.read_available(SHORT).await;
        assert_eq!(buffer.peek_all(), "end\u{FFFD}");
    }

    #[tokio::test]
    async fn test_pending_since() {
        let (tx, mut buffer) = buffer();
        send(&tx, b"Name: ");
        buffer.read_available(SHORT).await;

        let mark = buffer.position();
        assert_eq!(buffer.pending_since(mark), "");

        send(&tx, b"Age: ");
        buffer.read_available(SHORT).await;
        assert_eq!(buffer.pending_since(mark), "Age: ");
        assert_eq!(buffer.pending_since(0), "Name: Age: ");

        buffer.consume(8);
        assert_eq!(buffer.pending_since(mark), "e: ");
    }

    #[tokio::test]
    async fn test_compaction_keeps_positions() {
        let (tx, mut buffer) = buffer();
        tx.send(Bytes::from("x".repeat(COMPACT_THRESHOLD + 10))).unwrap();
        send(&tx, b"tail");
        buffer.read_available(SHORT).await;

        let end = buffer.position();
        buffer.consume(COMPACT_THRESHOLD + 10);

        assert_eq!(buffer.peek_all(), "tail");
        assert_eq!(buffer.position(), end);
        assert_eq!(buffer.cursor(), COMPACT_THRESHOLD + 10);
        assert_eq!(buffer.pending_since(end - 2), "il");
    }
}
