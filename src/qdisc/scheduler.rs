//! Enqueue, dequeue, and the deficit round-robin loop tying every other
//! component together.

use crate::qdisc::clock::Clock;
use crate::qdisc::codel::codel_dequeue;
use crate::qdisc::config::Config;
use crate::qdisc::cuckoo::CuckooTable;
use crate::qdisc::error::InitError;
use crate::qdisc::flow::{list_detach, list_push_back, FlowList, FlowRecord, ListLink};
use crate::qdisc::free_slots::FreeSlotIndex;
use crate::qdisc::packet::PacketHandle;
use crate::qdisc::stats::Counters;

/// Result of [`FqCodelQdisc::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Accepted; nothing more needed from the caller.
    Ok,
    /// Accepted, but the overload policy had to shed packets from the same
    /// flow this packet landed in to make room.
    Congestion,
    /// Rejected outright: classifier bypass, or the flow table is exhausted.
    Dropped,
}

/// What the external pre-cuckoo hook decided for a packet. Consolidates the
/// "priority shortcut" and "external filter" stages, which both reduce to
/// "pick a flow, reject, or let the cuckoo classifier decide".
pub enum ExternalVerdict {
    UseFlow(u32),
    Reject,
    Fallthrough,
}

/// A read-only view of one active flow, yielded by [`Self::walk`].
#[derive(Debug, Clone)]
pub struct FlowView {
    pub slot: u32,
    pub backlog_bytes: u64,
    pub fifo_len: usize,
    pub deficit: i64,
    pub drop_count: u64,
}

pub struct FqCodelQdisc<P: PacketHandle, C: Clock> {
    pub(crate) clock: C,
    pub(crate) config: Config,
    pub(crate) flows: Vec<FlowRecord<P>>,
    pub(crate) backlog: Vec<u64>,
    pub(crate) cuckoo: CuckooTable,
    pub(crate) free_slots: FreeSlotIndex,
    pub(crate) new_list: FlowList,
    pub(crate) old_list: FlowList,
    pub(crate) counters: Counters,
    pub(crate) external_classifier: Option<Box<dyn FnMut(&P) -> ExternalVerdict + Send>>,
    pub(crate) peeked: Option<P>,
}

impl<P: PacketHandle, C: Clock> FqCodelQdisc<P, C> {
    /// Allocates every fixed-size structure named in `config` up front.
    /// Allocation failure unwinds cleanly: nothing partially built escapes
    /// this function, there's simply no `Self` to return.
    pub fn try_new(config: Config, clock: C) -> Result<Self, InitError> {
        let flows_cnt = config.flows_cnt();

        let mut flows = Vec::new();
        flows.try_reserve_exact(flows_cnt as usize)?;
        for _ in 0..flows_cnt {
            flows.push(FlowRecord::new());
        }

        let mut backlog = Vec::new();
        backlog.try_reserve_exact(flows_cnt as usize)?;
        backlog.resize(flows_cnt as usize, 0);

        // Two independent per-table seeds. A previous implementation's
        // `sizeof(32)` (the literal integer, not `sizeof(u32)`) allocation
        // only ever reserved room for one; this reserves both up front as
        // two real u32s.
        let seeds: [u32; 2] = [rand::random(), rand::random()];
        let cuckoo = CuckooTable::try_new(flows_cnt, seeds[0], seeds[1])?;
        let free_slots = FreeSlotIndex::new(flows_cnt);

        Ok(Self {
            clock,
            config,
            flows,
            backlog,
            cuckoo,
            free_slots,
            new_list: FlowList::default(),
            old_list: FlowList::default(),
            counters: Counters::default(),
            external_classifier: None,
            peeked: None,
        })
    }

    pub fn set_external_classifier<F>(&mut self, f: F)
    where
        F: FnMut(&P) -> ExternalVerdict + Send + 'static,
    {
        self.external_classifier = Some(Box::new(f));
    }

    pub fn clear_external_classifier(&mut self) {
        self.external_classifier = None;
    }

    /// Exposes the clock this instance was built with, mainly so test and
    /// benchmark harnesses driving a [`crate::qdisc::ManualClock`] can
    /// advance time between calls.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn enqueue(&mut self, mut packet: P) -> EnqueueOutcome {
        let now = self.clock.now_nanos();
        let idx = self.classify(&packet);
        if idx == 0 {
            self.counters.drops_classifier_reject += 1;
            return EnqueueOutcome::Dropped;
        }
        let slot = idx - 1;

        packet.set_enqueue_timestamp(now);
        let bytes = packet.byte_length() as u64;
        let mem = packet.memory_footprint() as u64;

        let was_linked = self.flows[slot as usize].link != ListLink::None;
        self.flows[slot as usize].fifo.push_back(packet);
        self.backlog[slot as usize] += bytes;
        self.counters.packets_queued += 1;
        self.counters.bytes_queued += bytes;
        self.counters.memory_used += mem;
        self.free_slots.mark_occupied(slot);

        if !was_linked {
            self.flows[slot as usize].deficit = self.config.quantum as i64;
            self.flows[slot as usize].drop_count = 0;
            list_push_back(&mut self.new_list, &mut self.flows, slot, ListLink::New);
        }

        if self.counters.packets_queued <= self.config.limit as u64 && self.counters.memory_used <= self.config.memory_limit
        {
            return EnqueueOutcome::Ok;
        }

        match self.overload_drop() {
            Some(fattest) if fattest == slot => EnqueueOutcome::Congestion,
            _ => EnqueueOutcome::Ok,
        }
    }

    pub fn dequeue(&mut self) -> Option<P> {
        if let Some(packet) = self.peeked.take() {
            return Some(packet);
        }
        self.dequeue_fresh()
    }

    pub fn peek(&mut self) -> Option<&P> {
        if self.peeked.is_none() {
            self.peeked = self.dequeue_fresh();
        }
        self.peeked.as_ref()
    }

    fn dequeue_fresh(&mut self) -> Option<P> {
        loop {
            let (slot, came_from_new) = match self.new_list.head {
                Some(s) => (s, true),
                None => match self.old_list.head {
                    Some(s) => (s, false),
                    None => return None,
                },
            };

            if self.flows[slot as usize].deficit <= 0 {
                self.flows[slot as usize].deficit += self.config.quantum as i64;
                let src = if came_from_new { &mut self.new_list } else { &mut self.old_list };
                list_detach(src, &mut self.flows, slot);
                list_push_back(&mut self.old_list, &mut self.flows, slot, ListLink::Old);
                continue;
            }

            let now = self.clock.now_nanos();
            let (packet, report) = codel_dequeue(
                &mut self.flows[slot as usize].codel,
                &mut self.flows[slot as usize].fifo,
                &mut self.backlog[slot as usize],
                &self.config,
                now,
            );

            self.flows[slot as usize].drop_count += report.dropped as u64;
            self.counters.drops_codel += report.dropped as u64;
            self.counters.ecn_marks += report.marked as u64;
            self.counters.ce_marks += report.ce_marked as u64;
            self.counters.packets_queued = self.counters.packets_queued.saturating_sub(report.dropped as u64);
            self.counters.bytes_queued = self.counters.bytes_queued.saturating_sub(report.dropped_bytes);
            self.counters.memory_used = self.counters.memory_used.saturating_sub(report.dropped_mem);

            match packet {
                None => {
                    // starvation prevention: a flow CoDel drained to empty
                    // is forced onto old-flows (not dropped from rotation)
                    // if it arrived from new-flows and old-flows still has
                    // work waiting, guaranteeing every flow gets a turn.
                    let src = if came_from_new { &mut self.new_list } else { &mut self.old_list };
                    if came_from_new && !self.old_list.is_empty() {
                        list_detach(src, &mut self.flows, slot);
                        list_push_back(&mut self.old_list, &mut self.flows, slot, ListLink::Old);
                    } else {
                        list_detach(src, &mut self.flows, slot);
                    }
                    continue;
                }
                Some(packet) => {
                    self.flows[slot as usize].deficit -= packet.byte_length() as i64;
                    self.counters.packets_queued = self.counters.packets_queued.saturating_sub(1);
                    self.counters.bytes_queued =
                        self.counters.bytes_queued.saturating_sub(packet.byte_length() as u64);
                    self.counters.memory_used =
                        self.counters.memory_used.saturating_sub(packet.memory_footprint() as u64);

                    if self.flows[slot as usize].fifo.is_empty() {
                        self.free_slots.mark_empty(slot);
                        let h0 = self.flows[slot as usize].h0;
                        let h1 = self.flows[slot as usize].h1;
                        self.cuckoo.clear_if(h0, slot + 1);
                        self.cuckoo.clear_if(h1, slot + 1);
                    }
                    return Some(packet);
                }
            }
        }
    }
}
