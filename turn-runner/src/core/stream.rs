//! Incremental consumer of raw simulation stdout.
//!
//! [`TurnStream`] owns everything a single run accumulates from stdout: the
//! partial-line carry, the parser state and a bounded copy of the raw text.

use crate::core::line_buffer::LineBuffer;
use crate::core::parser::{Clock, EventParser, ParsedTurn, wall_clock};
use crate::core::types::TurnUpdate;

/// Parsed records plus the raw text they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutput {
    pub parsed: ParsedTurn,
    pub raw_output: String,
    pub lines: usize,
}

pub struct TurnStream {
    buffer: LineBuffer,
    parser: EventParser,
    raw: Vec<u8>,
    raw_limit: usize,
    raw_truncated: usize,
    lines: usize,
}

impl TurnStream {
    pub fn new(raw_limit: usize) -> Self {
        Self::with_clock(raw_limit, wall_clock)
    }

    pub fn with_clock(raw_limit: usize, clock: Clock) -> Self {
        Self {
            buffer: LineBuffer::new(),
            parser: EventParser::with_clock(clock),
            raw: Vec::new(),
            raw_limit,
            raw_truncated: 0,
            lines: 0,
        }
    }

    /// Consume one chunk in arrival order, reporting every record change to `on_update`.
    pub fn feed(&mut self, chunk: &[u8], on_update: &mut dyn FnMut(TurnUpdate)) {
        self.keep_raw(chunk);
        for line in self.buffer.feed(chunk) {
            self.apply(&line, on_update);
        }
    }

    /// Flush the unterminated tail and return everything accumulated.
    pub fn finish(mut self, on_update: &mut dyn FnMut(TurnUpdate)) -> StreamOutput {
        if let Some(line) = self.buffer.flush() {
            self.apply(&line, on_update);
        }
        let mut raw_output = String::from_utf8_lossy(&self.raw).into_owned();
        if self.raw_truncated > 0 {
            raw_output.push_str(&format!(
                "\n[stdout truncated {} bytes]\n",
                self.raw_truncated
            ));
        }
        StreamOutput {
            parsed: self.parser.finish(),
            raw_output,
            lines: self.lines,
        }
    }

    fn apply(&mut self, line: &str, on_update: &mut dyn FnMut(TurnUpdate)) {
        self.lines += 1;
        if let Some(update) = self.parser.parse_line(line) {
            on_update(update);
        }
    }

    fn keep_raw(&mut self, chunk: &[u8]) {
        let remaining = self.raw_limit.saturating_sub(self.raw.len());
        let keep = chunk.len().min(remaining);
        self.raw.extend_from_slice(&chunk[..keep]);
        self.raw_truncated += chunk.len() - keep;
    }
}

/// Parse a complete captured transcript, e.g. a saved stdout log.
pub fn parse_transcript(text: &str, clock: Clock) -> ParsedTurn {
    let mut stream = TurnStream::with_clock(0, clock);
    stream.feed(text.as_bytes(), &mut |_| {});
    stream.finish(&mut |_| {}).parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_clock() -> String {
        "t".to_string()
    }

    const TRANSCRIPT: &str = "🎭 Alice\n🤔 Decision: rests\n✅ Result: refreshed\n🤝 Alice meets Bob at library\nInteraction type: friendly\n💰 Alice shares $5 with Bob";

    #[test]
    fn chunking_does_not_change_parsed_records() {
        let expected = parse_transcript(TRANSCRIPT, fixed_clock);
        assert_eq!(expected.log.len(), 1);
        assert_eq!(expected.interactions.len(), 1);

        let bytes = TRANSCRIPT.as_bytes();
        for size in 1..=bytes.len() {
            let mut stream = TurnStream::with_clock(usize::MAX, fixed_clock);
            for chunk in bytes.chunks(size) {
                stream.feed(chunk, &mut |_| {});
            }
            let output = stream.finish(&mut |_| {});
            assert_eq!(output.parsed, expected, "chunk size {size}");
            assert_eq!(output.raw_output, TRANSCRIPT);
        }
    }

    #[test]
    fn updates_arrive_in_line_order() {
        let mut stream = TurnStream::with_clock(1024, fixed_clock);
        let mut kinds = Vec::new();
        stream.feed(TRANSCRIPT.as_bytes(), &mut |update| kinds.push(update));
        stream.finish(&mut |update| kinds.push(update));

        let names: Vec<&str> = kinds
            .iter()
            .map(|update| match update {
                TurnUpdate::TurnStarted(_) => "turn_started",
                TurnUpdate::TurnAmended(_) => "turn_amended",
                TurnUpdate::InteractionStarted(_) => "interaction_started",
                TurnUpdate::InteractionAmended(_) => "interaction_amended",
            })
            .collect();
        assert_eq!(
            names,
            vec![
                "turn_started",
                "turn_amended",
                "turn_amended",
                "interaction_started",
                "interaction_amended",
                "interaction_amended",
            ]
        );
    }

    #[test]
    fn raw_output_is_bounded_with_notice() {
        let mut stream = TurnStream::with_clock(4, fixed_clock);
        stream.feed(b"abcdef\n", &mut |_| {});
        let output = stream.finish(&mut |_| {});
        assert_eq!(output.raw_output, "abcd\n[stdout truncated 3 bytes]\n");
        assert_eq!(output.lines, 1);
    }
}
