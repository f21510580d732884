//! Accumulated program output with an optional tail-only search window.
//!
//! Output arrives as raw byte chunks that may split a multi-byte UTF-8
//! character; the incomplete tail is held back until the next chunk
//! completes it.

use crate::pattern::{PatternMatch, PatternSet};

/// Text read from the program that has not been consumed by a match yet.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    text: String,
    pending: Vec<u8>,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of raw output.
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    self.text
                        .push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match e.error_len() {
                        // Truncated sequence at the end: wait for more bytes.
                        None => {
                            start = valid_end;
                            break;
                        }
                        Some(bad) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + bad;
                        }
                    }
                }
            }
        }
        self.pending.drain(..start);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length of the decoded text in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Byte offset where the last `window` characters begin.
    pub fn window_start(&self, window: Option<usize>) -> usize {
        match window {
            Some(0) => self.text.len(),
            Some(chars) => self
                .text
                .char_indices()
                .rev()
                .nth(chars - 1)
                .map_or(0, |(idx, _)| idx),
            None => 0,
        }
    }

    /// Search the buffer, or only its last `window` characters, for the
    /// earliest match in `patterns`.
    ///
    /// Returned offsets are relative to the whole buffer.
    pub fn find(&self, patterns: &PatternSet, window: Option<usize>) -> Option<PatternMatch> {
        let offset = self.window_start(window);
        patterns.find(&self.text[offset..]).map(|m| PatternMatch {
            index: m.index,
            start: m.start + offset,
            end: m.end + offset,
        })
    }

    /// Remove everything up to the end of `m`, returning the text before the
    /// match and the matched text.
    pub fn consume(&mut self, m: &PatternMatch) -> (String, String) {
        let after = self.text[m.start..m.end].to_string();
        let before = self.text[..m.start].to_string();
        self.text.drain(..m.end);
        (before, after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt_set(pattern: &str) -> PatternSet {
        let mut set = PatternSet::new();
        set.push("prompt", pattern).unwrap();
        set
    }

    #[test]
    fn test_push_and_find() {
        let mut buffer = StreamBuffer::new();
        buffer.push(b"echo hi\r\nhi\r\n");
        buffer.push(b"bash> ");
        let m = buffer.find(&prompt_set(r"\r\nbash> "), None).unwrap();
        assert_eq!(m.start, 11);
        assert_eq!(m.end, buffer.len());
    }

    #[test]
    fn test_split_utf8_character() {
        let mut buffer = StreamBuffer::new();
        let bytes = "héllo".as_bytes();
        buffer.push(&bytes[..2]);
        assert_eq!(buffer.as_str(), "h");
        buffer.push(&bytes[2..]);
        assert_eq!(buffer.as_str(), "héllo");
    }

    #[test]
    fn test_invalid_utf8_replaced() {
        let mut buffer = StreamBuffer::new();
        buffer.push(b"a\xffb");
        assert_eq!(buffer.as_str(), "a\u{fffd}b");
    }

    #[test]
    fn test_window_hides_older_match() {
        let mut buffer = StreamBuffer::new();
        buffer.push(b"router# ");
        buffer.push(&[b'x'; 100]);
        let set = prompt_set("router# ");

        assert!(buffer.find(&set, Some(10)).is_none());
        assert_eq!(buffer.find(&set, None).map(|m| m.start), Some(0));
    }

    #[test]
    fn test_window_offsets_are_absolute() {
        let mut buffer = StreamBuffer::new();
        buffer.push(&[b'x'; 50]);
        buffer.push(b"\r\n> ");
        let m = buffer.find(&prompt_set(r"\r\n> "), Some(8)).unwrap();
        assert_eq!(m.start, 50);
        assert!(m.start >= buffer.len() - 8);
    }

    #[test]
    fn test_window_counts_characters() {
        let mut buffer = StreamBuffer::new();
        buffer.push("ééé".as_bytes());
        assert_eq!(buffer.window_start(Some(2)), 2);
        assert_eq!(buffer.window_start(Some(10)), 0);
        assert_eq!(buffer.window_start(Some(0)), buffer.len());
    }

    #[test]
    fn test_consume_advances_past_match() {
        let mut buffer = StreamBuffer::new();
        buffer.push(b"out\r\n> trailing");
        let m = buffer.find(&prompt_set(r"\r\n> "), None).unwrap();
        let (before, after) = buffer.consume(&m);
        assert_eq!(before, "out");
        assert_eq!(after, "\r\n> ");
        assert_eq!(buffer.as_str(), "trailing");
    }
}
