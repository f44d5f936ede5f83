//! The control-plane surface: configure, reset, snapshot, walk.
//!
//! All four methods take `&mut self`, so Rust's borrow checker is the
//! exclusion barrier that keeps them from running alongside enqueue/dequeue
//! on the same instance — there is nothing further to implement for that.

use crate::qdisc::clock::Clock;
use crate::qdisc::config::ConfigUpdate;
use crate::qdisc::error::ConfigError;
use crate::qdisc::flow::ListLink;
use crate::qdisc::packet::PacketHandle;
use crate::qdisc::scheduler::{FlowView, FqCodelQdisc};
use crate::qdisc::stats::StatsSnapshot;

impl<P: PacketHandle, C: Clock> FqCodelQdisc<P, C> {
    /// Applies a configuration change. If the new `limit`/`memory_limit` are
    /// tighter than the current occupancy, drains via dequeue until the
    /// scheduler is back within bounds rather than leaving it in a
    /// transiently-over-limit state.
    pub fn configure(&mut self, update: ConfigUpdate) -> Result<(), ConfigError> {
        self.config.apply(update)?;
        while self.counters.packets_queued > self.config.limit as u64
            || self.counters.memory_used > self.config.memory_limit
        {
            if self.dequeue().is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Purges every flow, resets CoDel and list state, and returns the
    /// cuckoo table and free-slot bitmap to their just-allocated state.
    /// Configuration is left untouched.
    pub fn reset(&mut self) {
        for flow in &mut self.flows {
            flow.reset();
        }
        for backlog in &mut self.backlog {
            *backlog = 0;
        }
        self.cuckoo.reset();
        self.free_slots.reset();
        self.new_list = Default::default();
        self.old_list = Default::default();
        self.counters = Default::default();
        self.peeked = None;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.counters.into()
    }

    /// Visits every non-empty flow in slot order.
    pub fn walk<F: FnMut(FlowView)>(&self, mut visitor: F) {
        for (slot, flow) in self.flows.iter().enumerate() {
            if flow.link == ListLink::None {
                continue;
            }
            visitor(FlowView {
                slot: slot as u32,
                backlog_bytes: self.backlog[slot],
                fifo_len: flow.fifo.len(),
                deficit: flow.deficit,
                drop_count: flow.drop_count,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::qdisc::clock::ManualClock;
    use crate::qdisc::config::{Config, ConfigUpdate};
    use crate::qdisc::scheduler::tests::TestPacket;
    use crate::qdisc::scheduler::FqCodelQdisc;

    fn sched(flows_cnt: u32) -> FqCodelQdisc<TestPacket, ManualClock> {
        let config = Config::new(flows_cnt).unwrap();
        FqCodelQdisc::try_new(config, ManualClock::new(0)).unwrap()
    }

    #[test]
    fn configure_rejects_flows_cnt_change() {
        let mut q = sched(4);
        let err = q
            .configure(ConfigUpdate {
                flows_cnt: Some(8),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, crate::qdisc::error::ConfigError::FlowsCountAlreadySet(4)));
    }

    #[test]
    fn configure_tightening_limit_drains_backlog() {
        let mut q = sched(4);
        for i in 0..10u64 {
            q.enqueue(TestPacket::new(i, 1, 100));
        }
        q.configure(ConfigUpdate {
            limit: Some(2),
            ..Default::default()
        })
        .unwrap();
        assert!(q.snapshot().packets_queued <= 2);
    }

    #[test]
    fn walk_visits_only_linked_flows_in_slot_order() {
        let mut q = sched(4);
        q.enqueue(TestPacket::new(1, 10, 100));
        q.enqueue(TestPacket::new(2, 20, 100));

        let mut slots = Vec::new();
        q.walk(|view| slots.push(view.slot));
        assert_eq!(slots.len(), 2);
        assert!(slots[0] < slots[1]);
    }
}
