//! An `Arc<Mutex<_>>` convenience wrapper for callers that need to reach a
//! single scheduler instance from more than one task — a stats reporter
//! polling `snapshot()` while another task drives enqueue/dequeue, say. The
//! core itself never locks anything; this is purely for callers who don't
//! want to thread a `&mut FqCodelQdisc` through their own structure.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::qdisc::clock::Clock;
use crate::qdisc::config::ConfigUpdate;
use crate::qdisc::error::ConfigError;
use crate::qdisc::packet::PacketHandle;
use crate::qdisc::scheduler::{EnqueueOutcome, FqCodelQdisc};
use crate::qdisc::stats::StatsSnapshot;

#[derive(Clone)]
pub struct SharedQdisc<P: PacketHandle, C: Clock> {
    inner: Arc<Mutex<FqCodelQdisc<P, C>>>,
}

impl<P: PacketHandle, C: Clock> SharedQdisc<P, C> {
    pub fn new(qdisc: FqCodelQdisc<P, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(qdisc)),
        }
    }

    pub fn enqueue(&self, packet: P) -> EnqueueOutcome {
        self.inner.lock().enqueue(packet)
    }

    pub fn dequeue(&self) -> Option<P> {
        self.inner.lock().dequeue()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn configure(&self, update: ConfigUpdate) -> Result<(), ConfigError> {
        self.inner.lock().configure(update)
    }
}
