//! Timed send sequences
//!
//! A sequence holds the items of one `send_many` call. The session manager
//! releases one item per interval when its scheduler calls
//! `pump_sequences`; the manager itself owns no timer.

use commconsole_core::{SequenceId, SequenceReport};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Callback fired exactly once when a sequence ends
pub type CompletionCallback = Box<dyn FnOnce(SequenceReport) + Send>;

/// Pending items of one `send_many` call
pub(crate) struct SendSequence {
    pub(crate) id: SequenceId,
    pub(crate) port: String,
    items: VecDeque<String>,
    interval: Duration,
    next_due: Instant,
    pub(crate) report: SequenceReport,
    on_complete: Option<CompletionCallback>,
}

impl SendSequence {
    pub(crate) fn new(
        port: String,
        items: VecDeque<String>,
        interval: Duration,
        start: Instant,
        on_complete: CompletionCallback,
    ) -> Self {
        Self {
            id: SequenceId::new(),
            port,
            items,
            interval,
            next_due: start,
            report: SequenceReport::default(),
            on_complete: Some(on_complete),
        }
    }

    /// Take the next item if it is due at `now`, scheduling the one after it
    pub(crate) fn take_due(&mut self, now: Instant) -> Option<String> {
        if now < self.next_due {
            return None;
        }
        let item = self.items.pop_front()?;
        self.next_due = now + self.interval;
        Some(item)
    }

    pub(crate) fn is_drained(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop everything not yet sent
    pub(crate) fn cancel(&mut self) {
        self.report.dropped += self.items.len();
        self.items.clear();
    }

    /// Fire the completion callback and hand back the final report
    pub(crate) fn finish(mut self) -> (SequenceId, SequenceReport) {
        let report = self.report;
        if let Some(callback) = self.on_complete.take() {
            callback(report);
        }
        (self.id, report)
    }
}
