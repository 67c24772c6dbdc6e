//! Per-port text buffer

/// Accumulated text of one session
///
/// With a character cap set, the oldest text is trimmed once the buffer grows
/// past it. Trimming always lands on a character boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionLog {
    text: String,
    chars: usize,
    max_chars: Option<usize>,
}

impl SessionLog {
    /// Create an empty, unbounded log
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty log keeping at most `max_chars` characters
    pub fn with_capacity_limit(max_chars: Option<usize>) -> Self {
        Self {
            max_chars,
            ..Self::default()
        }
    }

    /// Append text at the end
    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
        self.chars += text.chars().count();
        self.enforce_limit();
    }

    /// Replace the whole buffer
    pub fn replace(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
        self.chars = text.chars().count();
        self.enforce_limit();
    }

    /// Empty the buffer
    pub fn clear(&mut self) {
        self.text.clear();
        self.chars = 0;
    }

    /// Buffer contents
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of characters held
    pub fn len(&self) -> usize {
        self.chars
    }

    /// Whether the buffer holds no text
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Configured character cap
    pub fn max_chars(&self) -> Option<usize> {
        self.max_chars
    }

    fn enforce_limit(&mut self) {
        let Some(max) = self.max_chars else {
            return;
        };
        if self.chars <= max {
            return;
        }

        let excess = self.chars - max;
        let cut = self
            .text
            .char_indices()
            .nth(excess)
            .map_or(self.text.len(), |(index, _)| index);
        self.text.drain(..cut);
        self.chars = max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_clear() {
        let mut log = SessionLog::new();
        log.append("AT\n");
        log.append("OK\r\n");
        assert_eq!(log.as_str(), "AT\nOK\r\n");
        assert_eq!(log.len(), 7);

        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
    }

    #[test]
    fn test_limit_trims_oldest() {
        let mut log = SessionLog::with_capacity_limit(Some(5));
        log.append("abc");
        log.append("defg");
        assert_eq!(log.as_str(), "cdefg");
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn test_limit_respects_char_boundaries() {
        let mut log = SessionLog::with_capacity_limit(Some(3));
        log.append("\u{e9}\u{e8}\u{ea}\u{eb}");
        assert_eq!(log.as_str(), "\u{e8}\u{ea}\u{eb}");
    }

    #[test]
    fn test_replace_applies_limit() {
        let mut log = SessionLog::with_capacity_limit(Some(2));
        log.replace("hello");
        assert_eq!(log.as_str(), "lo");
    }
}
