//! Running counters and the serialisable snapshot taken from them.

use serde::{Deserialize, Serialize};

/// Plain `u64` fields: the scheduler core runs on a single thread with no
/// internal locking, so there's nothing atomic to gain here.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Counters {
    pub packets_queued: u64,
    pub bytes_queued: u64,
    pub memory_used: u64,
    pub drops_classifier_reject: u64,
    pub drops_codel: u64,
    pub drops_overload: u64,
    pub ecn_marks: u64,
    pub ce_marks: u64,
}

/// A point-in-time copy of [`Counters`], safe to hand to a stats-reporting
/// transport without holding the scheduler borrowed.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub packets_queued: u64,
    pub bytes_queued: u64,
    pub memory_used: u64,
    pub drops_classifier_reject: u64,
    pub drops_codel: u64,
    pub drops_overload: u64,
    pub ecn_marks: u64,
    pub ce_marks: u64,
}

impl From<Counters> for StatsSnapshot {
    fn from(c: Counters) -> Self {
        Self {
            packets_queued: c.packets_queued,
            bytes_queued: c.bytes_queued,
            memory_used: c.memory_used,
            drops_classifier_reject: c.drops_classifier_reject,
            drops_codel: c.drops_codel,
            drops_overload: c.drops_overload,
            ecn_marks: c.ecn_marks,
            ce_marks: c.ce_marks,
        }
    }
}
