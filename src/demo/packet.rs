//! A concrete, in-process [`PacketHandle`] implementation for the bundled
//! benchmark binary. Production callers wrap whatever packet type their own
//! networking stack already has; this one exists so `fqbench` has something
//! to feed the scheduler without pulling in real sockets.

use serde::{Deserialize, Serialize};

use crate::qdisc::PacketHandle;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoPacket {
    pub flow_id: u32,
    pub seq: u64,
    pub len: u32,
    enqueued_ns: u64,
    ecn_capable: bool,
    ce_marked: bool,
}

impl DemoPacket {
    pub fn new(flow_id: u32, seq: u64, len: u32, ecn_capable: bool) -> Self {
        Self {
            flow_id,
            seq,
            len,
            enqueued_ns: 0,
            ecn_capable,
            ce_marked: false,
        }
    }

    pub fn was_ce_marked(&self) -> bool {
        self.ce_marked
    }
}

impl PacketHandle for DemoPacket {
    fn byte_length(&self) -> u32 {
        self.len
    }

    fn memory_footprint(&self) -> u32 {
        // wire bytes plus a fixed per-packet bookkeeping overhead, matching
        // the rough shape real qdiscs use for skb overhead.
        self.len + 256
    }

    fn flow_hash(&self) -> u32 {
        self.flow_id
    }

    fn flow_hash_perturb(&self, seed: u32) -> u32 {
        self.flow_id.wrapping_mul(2_654_435_761).wrapping_add(seed)
    }

    fn enqueue_timestamp(&self) -> u64 {
        self.enqueued_ns
    }

    fn set_enqueue_timestamp(&mut self, ts_ns: u64) {
        self.enqueued_ns = ts_ns;
    }

    fn is_ecn_capable(&self) -> bool {
        self.ecn_capable
    }

    fn mark_ecn(&mut self) {
        self.ce_marked = true;
    }
}
