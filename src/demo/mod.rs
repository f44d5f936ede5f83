//! The in-process benchmark pipeline bundled with this crate: a traffic
//! [`generator`], the scheduler itself, and a [`collector`] that turns raw
//! enqueue/dequeue events into an [`collector::AnalysisReport`]. This is what
//! `fqbench` drives; it is not part of the scheduler's public contract.

pub mod collector;
pub mod generator;
pub mod packet;

use tracing::{debug, info};

use crate::qdisc::{EnqueueOutcome, FqCodelQdisc, ManualClock, PacketHandle};

use collector::{AnalysisReport, Collector};
use generator::Workload;
use packet::DemoPacket;

/// Drains and re-feeds a [`FqCodelQdisc`] against a workload for
/// `duration_ns`, modeling a fixed-bandwidth egress link: the scheduler only
/// gets to dequeue a packet once `bandwidth_bps` would have finished
/// transmitting the previous one.
pub fn run_once(
    mut qdisc: FqCodelQdisc<DemoPacket, ManualClock>,
    mut workload: Workload,
    duration_ns: u64,
    bandwidth_bps: u64,
    strategy_name: &str,
) -> AnalysisReport {
    let mut collector = Collector::new();
    let mut next_arrival = workload.pop_next();
    let mut link_free_at_ns: u64 = 0;
    let mut now_ns: u64 = 0;

    loop {
        let (arrival_ns, packet) = &next_arrival;
        if *arrival_ns > duration_ns {
            break;
        }

        now_ns = now_ns.max(*arrival_ns);
        qdisc.clock().set(now_ns);

        match qdisc.enqueue(packet.clone()) {
            EnqueueOutcome::Ok => collector.record_sent(),
            EnqueueOutcome::Congestion => collector.record_sent(),
            EnqueueOutcome::Dropped => {
                collector.record_sent();
                collector.record_dropped();
            }
        }
        next_arrival = workload.pop_next();

        while now_ns >= link_free_at_ns {
            qdisc.clock().set(now_ns);
            match qdisc.dequeue() {
                Some(p) => {
                    let sojourn_ns = now_ns.saturating_sub(p.enqueue_timestamp());
                    collector.record_delivered(p.byte_length(), sojourn_ns);
                    if p.was_ce_marked() {
                        debug!(flow = p.flow_id, "packet delivered with CE mark");
                    }
                    let tx_ns = (p.byte_length() as u64 * 8 * 1_000_000_000) / bandwidth_bps.max(1);
                    link_free_at_ns = now_ns + tx_ns.max(1);
                }
                None => break,
            }
        }

        let mut backlog_packets = 0usize;
        qdisc.walk(|view| backlog_packets += view.fifo_len);
        collector.record_queue_length(backlog_packets);
        collector.advance_elapsed(now_ns);
    }

    collector.advance_elapsed(duration_ns);
    info!(strategy = strategy_name, "benchmark run complete");
    collector.report(strategy_name)
}
