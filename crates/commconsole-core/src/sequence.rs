//! Identity and outcome of a timed send sequence

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Handle for a pending send sequence.
///
/// Uniquely identifies a sequence registered with the session manager. Can be
/// used to cancel it before the last item goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceId(pub Uuid);

impl SequenceId {
    /// Create a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SequenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome handed to a sequence's completion callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceReport {
    /// Items written successfully
    pub sent: usize,
    /// Items skipped because no matching connection was open
    pub skipped: usize,
    /// Items whose write failed
    pub failed: usize,
    /// Items never attempted because the sequence was cancelled
    pub dropped: usize,
}

impl SequenceReport {
    /// True when every item was written
    pub fn is_complete(&self) -> bool {
        self.skipped == 0 && self.failed == 0 && self.dropped == 0
    }

    /// Total number of items the sequence carried
    pub fn total(&self) -> usize {
        self.sent + self.skipped + self.failed + self.dropped
    }
}

impl fmt::Display for SequenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sent, {} skipped, {} failed, {} dropped",
            self.sent, self.skipped, self.failed, self.dropped
        )
    }
}
