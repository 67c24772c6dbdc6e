//! Incremental UTF-8 decoding of received bytes
//!
//! Serial reads split the byte stream at arbitrary points, so a multi-byte
//! character can straddle two reads. The decoder holds back an incomplete
//! trailing sequence until the next chunk completes it. Invalid bytes become
//! U+FFFD and never raise.

use std::char::REPLACEMENT_CHARACTER;

/// Streaming lossy UTF-8 decoder
#[derive(Debug, Default, Clone)]
pub struct Utf8StreamDecoder {
    /// Incomplete trailing sequence from the previous chunk (at most 3 bytes)
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    /// Create a decoder with nothing pending
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, returning all text that is complete so far
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match e.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        None => {
                            // Truncated sequence at the end: wait for more bytes
                            self.pending = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush a dangling partial sequence as a replacement character
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT_CHARACTER.to_string()
        }
    }

    /// Whether bytes are held back waiting for the rest of a character
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_ascii() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"OK\r\n"), "OK\r\n");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_invalid_bytes_replaced() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"ab\xffcd"), "ab\u{FFFD}cd");
        assert_eq!(decoder.decode(b"\xc3\x28"), "\u{FFFD}(");
    }

    #[test]
    fn test_split_character_is_joined() {
        // "é" is 0xC3 0xA9
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"caf\xc3"), "caf");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(b"\xa9!"), "\u{e9}!");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_finish_flushes_partial() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"x\xe2\x82"), "x");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }

    proptest! {
        #[test]
        fn prop_split_matches_lossy(bytes in proptest::collection::vec(any::<u8>(), 0..64), split in 0usize..64) {
            let split = split.min(bytes.len());
            let mut decoder = Utf8StreamDecoder::new();
            let mut text = decoder.decode(&bytes[..split]);
            text.push_str(&decoder.decode(&bytes[split..]));
            text.push_str(&decoder.finish());
            prop_assert_eq!(text, String::from_utf8_lossy(&bytes).into_owned());
        }
    }
}
