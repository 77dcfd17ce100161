//! Incremental NDJSON stream decoding.
//!
//! The chat endpoint answers with a chunked body of newline-delimited JSON
//! records. Chunk boundaries are arbitrary: a chunk may end mid-line or in
//! the middle of a multi-byte UTF-8 character. [`StreamDecoder`] carries the
//! undelivered tail between chunks and only yields records parsed from
//! complete lines, in arrival order, regardless of how the transport sliced
//! the bytes.
//!
//! A malformed line is skipped with a warning; it never aborts the stream or
//! disturbs records decoded before or after it.

use tracing::{debug, warn};

use crate::models::StreamRecord;

/// Counters for one decoded stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Records successfully parsed.
    pub records: u64,
    /// Lines skipped as malformed (invalid UTF-8 or invalid JSON).
    pub warnings: u64,
}

/// Decoder state: the carried partial trailing line.
///
/// The carry is raw bytes, split at `\n` before UTF-8 validation. A newline
/// byte never occurs inside a multi-byte UTF-8 sequence, so a character
/// split across two chunks stays in the carry until the rest of its bytes
/// arrive.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    carry: Vec<u8>,
    stats: DecodeStats,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk and return the records it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamRecord> {
        self.carry.extend_from_slice(chunk);

        // Everything up to the last newline is complete; the rest may be a
        // partial line and stays in the carry.
        let Some(last_newline) = self.carry.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let tail = self.carry.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.carry, tail);

        complete
            .split(|&b| b == b'\n')
            .filter_map(|line| self.decode_line(line))
            .collect()
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<StreamRecord> {
        let text = match std::str::from_utf8(line) {
            Ok(text) => text.trim(),
            Err(err) => {
                self.stats.warnings += 1;
                warn!(%err, "skipping NDJSON line with invalid UTF-8");
                return None;
            }
        };
        // Blank lines are keep-alive padding, not an error.
        if text.is_empty() {
            return None;
        }
        match serde_json::from_str::<StreamRecord>(text) {
            Ok(record) => {
                self.stats.records += 1;
                Some(record)
            }
            Err(err) => {
                self.stats.warnings += 1;
                warn!(%err, line = text, "skipping malformed NDJSON line");
                None
            }
        }
    }

    /// End of input. A trailing line without its newline cannot be trusted
    /// as a complete record and is dropped.
    pub fn end(self) -> DecodeStats {
        if !self.carry.iter().all(|b| b.is_ascii_whitespace()) {
            debug!(
                bytes = self.carry.len(),
                "dropping truncated trailing line at end of stream"
            );
        }
        self.stats
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decode a full byte slice in one feed and return the token texts.
    fn decode_all(bytes: &[u8]) -> (Vec<String>, DecodeStats) {
        let mut decoder = StreamDecoder::new();
        let tokens = tokens_of(decoder.feed(bytes));
        (tokens, decoder.end())
    }

    fn tokens_of(records: Vec<StreamRecord>) -> Vec<String> {
        records.into_iter().filter_map(|r| r.response).collect()
    }

    const STREAM: &[u8] =
        "{\"response\":\"Hel\"}\n{\"response\":\"lo \\u00e9t\\u00e9 \"}\n{\"response\":\"日本語🦀\"}\n"
            .as_bytes();

    #[test]
    fn test_single_feed() {
        let (tokens, stats) = decode_all(STREAM);
        assert_eq!(tokens.concat(), "Hello été 日本語🦀");
        assert_eq!(stats, DecodeStats { records: 3, warnings: 0 });
    }

    #[test]
    fn test_every_two_chunk_split_matches_single_shot() {
        // Raw multi-byte characters in the line bodies make some split
        // offsets fall inside a character.
        let raw = "{\"response\":\"héllo \"}\n{\"response\":\"wörld 🦀\"}\n".as_bytes();
        let (expected, expected_stats) = decode_all(raw);

        for split in 0..=raw.len() {
            let mut decoder = StreamDecoder::new();
            let mut tokens = tokens_of(decoder.feed(&raw[..split]));
            tokens.extend(tokens_of(decoder.feed(&raw[split..])));
            let stats = decoder.end();
            assert_eq!(tokens, expected, "split at byte {}", split);
            assert_eq!(stats, expected_stats, "split at byte {}", split);
        }
    }

    #[test]
    fn test_byte_at_a_time_matches_single_shot() {
        let (expected, expected_stats) = decode_all(STREAM);

        let mut decoder = StreamDecoder::new();
        let mut tokens = Vec::new();
        for byte in STREAM {
            tokens.extend(tokens_of(decoder.feed(std::slice::from_ref(byte))));
        }
        assert_eq!(tokens, expected);
        assert_eq!(decoder.end(), expected_stats);
    }

    #[test]
    fn test_malformed_line_skipped_without_losing_neighbors() {
        let (tokens, stats) =
            decode_all(b"{\"response\":\"A\"}\n{bad json}\n{\"response\":\"B\"}\n");
        assert_eq!(tokens.concat(), "AB");
        assert_eq!(stats, DecodeStats { records: 2, warnings: 1 });
    }

    #[test]
    fn test_invalid_utf8_line_skipped() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"{\"response\":\"A\"}\n");
        bytes.extend_from_slice(&[0xff, 0xfe, 0xfd]);
        bytes.push(b'\n');
        bytes.extend_from_slice(b"{\"response\":\"B\"}\n");

        let (tokens, stats) = decode_all(&bytes);
        assert_eq!(tokens.concat(), "AB");
        assert_eq!(stats.warnings, 1);
    }

    #[test]
    fn test_blank_lines_are_not_warnings() {
        let (tokens, stats) = decode_all(b"\n  \n{\"response\":\"A\"}\n\n");
        assert_eq!(tokens.concat(), "A");
        assert_eq!(stats, DecodeStats { records: 1, warnings: 0 });
    }

    #[test]
    fn test_crlf_lines() {
        let (tokens, stats) = decode_all(b"{\"response\":\"A\"}\r\n{\"response\":\"B\"}\r\n");
        assert_eq!(tokens.concat(), "AB");
        assert_eq!(stats.records, 2);
    }

    #[test]
    fn test_truncated_trailing_line_dropped() {
        let (tokens, stats) = decode_all(b"{\"response\":\"A\"}\n{\"response\":\"cut");
        assert_eq!(tokens.concat(), "A");
        // The truncated tail is neither a record nor a warning.
        assert_eq!(stats, DecodeStats { records: 1, warnings: 0 });
    }

    #[test]
    fn test_record_without_response_field() {
        let mut decoder = StreamDecoder::new();
        let records = decoder.feed(b"{\"done\":true}\n");
        assert_eq!(records.len(), 1);
        assert!(records[0].response.is_none());
        assert_eq!(decoder.stats().records, 1);
    }

    #[test]
    fn test_no_newline_yields_nothing() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.feed(b"{\"response\":\"pending\"}").is_empty());
        assert_eq!(decoder.stats(), DecodeStats::default());
        // The newline arrives later and completes the line.
        let records = decoder.feed(b"\n");
        assert_eq!(tokens_of(records).concat(), "pending");
    }
}
