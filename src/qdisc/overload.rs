//! Head-drop overload policy: when the packet or memory limit is exceeded,
//! find the fattest flow and shed packets from the front of its queue.

use crate::qdisc::clock::Clock;
use crate::qdisc::packet::PacketHandle;
use crate::qdisc::scheduler::FqCodelQdisc;

impl<P: PacketHandle, C: Clock> FqCodelQdisc<P, C> {
    /// Returns the slot that packets were shed from, or `None` if there was
    /// nothing to drop (every flow empty, which shouldn't happen if the
    /// overall limit was actually exceeded, but costs nothing to handle).
    pub(crate) fn overload_drop(&mut self) -> Option<u32> {
        let (fattest, max_backlog) = self
            .backlog
            .iter()
            .enumerate()
            .max_by_key(|&(_, &bytes)| bytes)
            .map(|(slot, &bytes)| (slot as u32, bytes))?;

        if max_backlog == 0 {
            return None;
        }

        let half = max_backlog / 2;
        let mut dropped_bytes: u64 = 0;

        for _ in 0..self.config.drop_batch_size {
            if self.flows[fattest as usize].fifo.is_empty() {
                // a previous fix for an off-by-one here: the loop must check
                // the flow still has a packet before touching the front of
                // its queue, since the batch can legitimately drain it.
                break;
            }
            let packet = self.flows[fattest as usize].fifo.pop_front().unwrap();
            let bytes = packet.byte_length() as u64;
            let mem = packet.memory_footprint() as u64;

            self.backlog[fattest as usize] = self.backlog[fattest as usize].saturating_sub(bytes);
            self.counters.packets_queued = self.counters.packets_queued.saturating_sub(1);
            self.counters.bytes_queued = self.counters.bytes_queued.saturating_sub(bytes);
            self.counters.memory_used = self.counters.memory_used.saturating_sub(mem);
            self.counters.drops_overload += 1;
            self.flows[fattest as usize].drop_count += 1;
            dropped_bytes += bytes;

            if dropped_bytes > half {
                break;
            }
        }

        if self.flows[fattest as usize].fifo.is_empty() {
            self.free_slots.mark_empty(fattest);
            let h0 = self.flows[fattest as usize].h0;
            let h1 = self.flows[fattest as usize].h1;
            self.cuckoo.clear_if(h0, fattest + 1);
            self.cuckoo.clear_if(h1, fattest + 1);
        }

        Some(fattest)
    }
}
