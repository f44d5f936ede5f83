//! The packet contract the scheduler consumes.
//!
//! The scheduler never constructs or owns the packet payload; it only needs
//! enough of a contract to classify, account, and time-stamp whatever the
//! caller hands it. Implement this for your own packet type to drive the
//! scheduler; [`crate::demo::packet::DemoPacket`] is a reference
//! implementation used by the bundled benchmark binary.

/// Everything the scheduler needs from an opaque packet handle.
pub trait PacketHandle {
    /// Wire length in bytes, used for deficit accounting and backlog.
    fn byte_length(&self) -> u32;

    /// In-memory footprint in bytes, used for the memory-limit overload check.
    fn memory_footprint(&self) -> u32;

    /// A cryptographically-stable hash of the packet's flow identity
    /// (typically the 5-tuple). Used as a proxy for exact identity when two
    /// packets land in the same cuckoo bucket.
    fn flow_hash(&self) -> u32;

    /// `flow_hash` perturbed by a table-specific seed, used to compute a
    /// candidate cuckoo bucket.
    fn flow_hash_perturb(&self, seed: u32) -> u32;

    /// The nanosecond timestamp the scheduler stamped on this packet at
    /// enqueue time.
    fn enqueue_timestamp(&self) -> u64;

    /// Called once, at enqueue time.
    fn set_enqueue_timestamp(&mut self, ts_ns: u64);

    /// Whether this packet is ECN-capable transport (ECT).
    fn is_ecn_capable(&self) -> bool;

    /// Set the Congestion Experienced codepoint.
    fn mark_ecn(&mut self);
}
