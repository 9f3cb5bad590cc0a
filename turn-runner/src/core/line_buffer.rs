//! Reassembles complete lines from arbitrarily chunked process output.

/// Carries the partial trailing line between fed chunks.
///
/// Works on bytes so a multi-byte UTF-8 character split across two chunks is
/// decoded only once the whole line is available.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completes, in stream order.
    ///
    /// Line terminators (`\n`, with an optional preceding `\r`) are not included.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        // Bytes already pending hold no newline, so only the new chunk needs scanning.
        let mut scan_from = self.pending.len();
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[scan_from..].iter().position(|&b| b == b'\n') {
            let end = scan_from + offset;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
            scan_from = start;
        }
        self.pending.drain(..start);
        lines
    }

    /// Return the unterminated remainder at end of stream, if any.
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }

    /// Number of bytes waiting for a line terminator.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = "TURN 1 - 06:00 AM\n🎭 alex_chen\r\n🤔 Decision: write\n\n✅ Result: done";

    fn collect(chunks: &[&[u8]]) -> Vec<String> {
        let mut buffer = LineBuffer::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(buffer.feed(chunk));
        }
        lines.extend(buffer.flush());
        lines
    }

    #[test]
    fn single_chunk_yields_all_lines_and_flushes_tail() {
        let lines = collect(&[TRANSCRIPT.as_bytes()]);
        assert_eq!(
            lines,
            vec![
                "TURN 1 - 06:00 AM",
                "🎭 alex_chen",
                "🤔 Decision: write",
                "",
                "✅ Result: done",
            ]
        );
    }

    #[test]
    fn lines_are_independent_of_chunk_boundaries() {
        let bytes = TRANSCRIPT.as_bytes();
        let expected = collect(&[bytes]);

        for first in 0..=bytes.len() {
            for second in first..=bytes.len() {
                let lines = collect(&[&bytes[..first], &bytes[first..second], &bytes[second..]]);
                assert_eq!(lines, expected, "split at {first}/{second}");
            }
        }
    }

    #[test]
    fn byte_at_a_time_reassembles_multibyte_characters() {
        let bytes = TRANSCRIPT.as_bytes();
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        let lines = collect(&chunks);
        assert_eq!(lines[1], "🎭 alex_chen");
        assert!(lines.iter().all(|line| !line.contains('\u{FFFD}')));
    }

    #[test]
    fn partial_line_is_held_until_terminated() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.feed("🤝 alex_chen meets".as_bytes()).is_empty());
        assert_eq!(buffer.pending_len(), "🤝 alex_chen meets".len());
        let lines = buffer.feed(b" jamie_rodriguez at coffee_shop\nnext");
        assert_eq!(lines, vec!["🤝 alex_chen meets jamie_rodriguez at coffee_shop"]);
        assert_eq!(buffer.flush().as_deref(), Some("next"));
        assert_eq!(buffer.flush(), None);
    }
}
