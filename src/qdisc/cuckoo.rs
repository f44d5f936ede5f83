//! Two-table cuckoo hashing over a flat `2F`-slot array, plus the
//! classify/evict logic that sits on top of it.

use crate::qdisc::clock::Clock;
use crate::qdisc::packet::PacketHandle;
use crate::qdisc::scheduler::{ExternalVerdict, FqCodelQdisc};

/// The raw `2F`-slot table. Entry `0` means empty; anything else is a
/// 1-based flow index so a plain zeroed array starts out fully empty.
pub(crate) struct CuckooTable {
    slots: Vec<u32>,
    seed0: u32,
    seed1: u32,
    flows_cnt: u32,
}

impl CuckooTable {
    pub(crate) fn try_new(flows_cnt: u32, seed0: u32, seed1: u32) -> Result<Self, std::collections::TryReserveError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(flows_cnt as usize * 2)?;
        slots.resize(flows_cnt as usize * 2, 0);
        Ok(Self {
            slots,
            seed0,
            seed1,
            flows_cnt,
        })
    }

    pub(crate) fn reset(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = 0);
    }

    /// `(x * N) >> 32`, a fast alternative to `x % N` that stays fair when N
    /// isn't a power of two.
    fn reduce(x: u32, n: u32) -> u32 {
        (((x as u64) * (n as u64)) >> 32) as u32
    }

    pub(crate) fn hash0<P: PacketHandle>(&self, packet: &P) -> u32 {
        Self::reduce(packet.flow_hash_perturb(self.seed0), self.flows_cnt)
    }

    pub(crate) fn hash1<P: PacketHandle>(&self, packet: &P) -> u32 {
        self.flows_cnt + Self::reduce(packet.flow_hash_perturb(self.seed1), self.flows_cnt)
    }

    fn slot_at(&self, h: u32) -> u32 {
        self.slots[h as usize]
    }

    fn set_slot(&mut self, h: u32, value: u32) {
        self.slots[h as usize] = value;
    }

    /// Clears `h` only if it currently points at `flow_index_1based`; a
    /// no-op otherwise. Used for cleanup against both of a flow's stored
    /// hash candidates, only one of which is actually live at a time.
    pub(crate) fn clear_if(&mut self, h: u32, flow_index_1based: u32) {
        if self.slots[h as usize] == flow_index_1based {
            self.slots[h as usize] = 0;
        }
    }
}

impl<P: PacketHandle, C: Clock> FqCodelQdisc<P, C> {
    /// Priority shortcut / external filter, then the cuckoo classifier.
    /// Returns a 1-based flow index, or 0 for "no flow" (bypass-drop).
    pub(crate) fn classify(&mut self, packet: &P) -> u32 {
        if let Some(mut external) = self.external_classifier.take() {
            let verdict = external(packet);
            self.external_classifier = Some(external);
            match verdict {
                ExternalVerdict::UseFlow(idx) if idx >= 1 && idx <= self.config.flows_cnt() => return idx,
                ExternalVerdict::UseFlow(_) | ExternalVerdict::Reject => return 0,
                ExternalVerdict::Fallthrough => {}
            }
        }
        self.cuckoo_classify(packet)
    }

    fn cuckoo_classify(&mut self, packet: &P) -> u32 {
        let h0 = self.cuckoo.hash0(packet);
        let h1 = self.cuckoo.hash1(packet);
        let a = self.cuckoo.slot_at(h0);
        let b = self.cuckoo.slot_at(h1);
        let packet_hash = packet.flow_hash();

        if a == 0 && b == 0 {
            return match self.reserve_and_own(h0, h1) {
                Some(idx) => {
                    self.cuckoo.set_slot(h0, idx);
                    idx
                }
                None => 0,
            };
        }

        if a != 0 && b == 0 {
            let flow_idx = (a - 1) as usize;
            if self.flows[flow_idx].fifo.is_empty() || self.flows[flow_idx].head_flow_hash() == Some(packet_hash) {
                self.flows[flow_idx].h0 = h0;
                self.flows[flow_idx].h1 = h1;
                return a;
            }
            return match self.reserve_and_own(h0, h1) {
                Some(idx) => {
                    self.cuckoo.set_slot(h1, idx);
                    idx
                }
                None => 0,
            };
        }

        if a == 0 && b != 0 {
            let flow_idx = (b - 1) as usize;
            if self.flows[flow_idx].fifo.is_empty() || self.flows[flow_idx].head_flow_hash() == Some(packet_hash) {
                self.flows[flow_idx].h0 = h0;
                self.flows[flow_idx].h1 = h1;
                return b;
            }
            return match self.reserve_and_own(h0, h1) {
                Some(idx) => {
                    self.cuckoo.set_slot(h0, idx);
                    idx
                }
                None => 0,
            };
        }

        // both occupied
        let a_idx = (a - 1) as usize;
        let b_idx = (b - 1) as usize;
        if self.flows[a_idx].fifo.is_empty() {
            self.flows[a_idx].h0 = h0;
            self.flows[a_idx].h1 = h1;
            return a;
        }
        if self.flows[b_idx].fifo.is_empty() {
            self.flows[b_idx].h0 = h0;
            self.flows[b_idx].h1 = h1;
            return b;
        }
        if self.flows[a_idx].head_flow_hash() == Some(packet_hash) {
            self.flows[a_idx].h0 = h0;
            self.flows[a_idx].h1 = h1;
            return a;
        }
        if self.flows[b_idx].head_flow_hash() == Some(packet_hash) {
            self.flows[b_idx].h0 = h0;
            self.flows[b_idx].h1 = h1;
            return b;
        }

        match self.reserve_and_own(h0, h1) {
            Some(v) => {
                self.cuckoo_evict(v, h0);
                v
            }
            None => 0,
        }
    }

    /// Takes a free slot, marks it occupied, and stamps it with the given
    /// hash pair so cleanup has something correct to use even before a
    /// packet is actually enqueued into it.
    fn reserve_and_own(&mut self, h0: u32, h1: u32) -> Option<u32> {
        let slot = self.free_slots.next_empty()?;
        self.free_slots.mark_occupied(slot);
        self.flows[slot as usize].h0 = h0;
        self.flows[slot as usize].h1 = h1;
        Some(slot + 1)
    }

    /// Places 1-based value `v` into the cuckoo table, evicting and
    /// relocating incumbents as needed, starting at table 0 slot `start_h0`.
    /// Bounded to `flows_cnt` iterations; on exhaustion the incumbent keeps
    /// its slot and the collision is accepted (flows may then share a
    /// bucket stochastically rather than forcing an unbounded eviction
    /// chain, since the table cannot grow).
    fn cuckoo_evict(&mut self, mut v: u32, start_h0: u32) {
        let mut table: u8 = 0;
        let mut h = start_h0;

        for i in 0..self.config.flows_cnt() {
            let resident = self.cuckoo.slot_at(h);
            if resident == 0 {
                self.cuckoo.set_slot(h, v);
                return;
            }
            if i == self.config.flows_cnt() - 1 {
                return;
            }

            self.cuckoo.set_slot(h, v);
            v = resident;
            let flow_idx = (v - 1) as usize;
            if self.flows[flow_idx].fifo.is_empty() {
                // the evicted flow is retiring; dropping it from the table
                // is correct, there's nothing left to relocate.
                return;
            }

            table = 1 - table;
            let head_hash_input = self.flows[flow_idx].fifo.front().unwrap();
            h = if table == 0 {
                self.cuckoo.hash0(head_hash_input)
            } else {
                self.cuckoo.hash1(head_hash_input)
            };
        }
    }
}
