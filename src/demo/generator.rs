//! In-process traffic generation for `fqbench`, adapted from the traffic
//! patterns real agents used to drive over TCP: same rate-shaping math, fed
//! straight into the scheduler instead of a socket.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};

use super::packet::DemoPacket;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrafficPattern {
    Constant { rate_pps: f64 },
    Bursty { avg_rate_pps: f64, burst_size: u32 },
    Poisson { lambda: f64 },
    PeakTraffic { base_rate: f64, peak_rate: f64, peak_duration_s: f64 },
}

/// One flow's generator: tracks its own next-arrival time so a [`Workload`]
/// of many flows can be merged by earliest-arrival-first.
struct FlowGenerator {
    flow_id: u32,
    pattern: TrafficPattern,
    packet_len: u32,
    ecn_capable: bool,
    next_arrival_ns: u64,
    burst_remaining: u32,
    seq: u64,
    rng: StdRng,
}

impl FlowGenerator {
    fn interval_ns(&mut self, now_ns: u64) -> u64 {
        match &self.pattern {
            TrafficPattern::Constant { rate_pps } => (1_000_000_000.0 / rate_pps.max(0.01)) as u64,
            TrafficPattern::Bursty { avg_rate_pps, burst_size } => {
                if self.burst_remaining > 0 {
                    self.burst_remaining -= 1;
                    100_000 // 100us between packets inside a burst
                } else {
                    self.burst_remaining = burst_size.saturating_sub(1);
                    (*burst_size as f64 / avg_rate_pps.max(0.01) * 1_000_000_000.0) as u64
                }
            }
            TrafficPattern::Poisson { lambda } => {
                let dist = Exp::new(*lambda).unwrap_or_else(|_| Exp::new(1.0).unwrap());
                (dist.sample(&mut self.rng) * 1_000_000_000.0) as u64
            }
            TrafficPattern::PeakTraffic {
                base_rate,
                peak_rate,
                peak_duration_s,
            } => {
                let peak_ns = (*peak_duration_s * 1_000_000_000.0) as u64;
                let rate = if now_ns < peak_ns { *peak_rate } else { *base_rate };
                (1_000_000_000.0 / rate.max(0.01)) as u64
            }
        }
    }

    fn next(&mut self, now_ns: u64) -> DemoPacket {
        let seq = self.seq;
        self.seq += 1;
        let interval = self.interval_ns(now_ns);
        self.next_arrival_ns = now_ns + interval;
        DemoPacket::new(self.flow_id, seq, self.packet_len, self.ecn_capable)
    }
}

/// A fixed set of concurrent flows, each with its own pattern, merged into a
/// single chronological packet stream.
pub struct Workload {
    generators: Vec<FlowGenerator>,
}

impl Workload {
    pub fn new(flows: Vec<(u32, TrafficPattern, u32, bool)>, seed: u64) -> Self {
        let generators = flows
            .into_iter()
            .enumerate()
            .map(|(i, (flow_id, pattern, packet_len, ecn_capable))| FlowGenerator {
                flow_id,
                pattern,
                packet_len,
                ecn_capable,
                next_arrival_ns: 0,
                burst_remaining: 0,
                seq: 0,
                rng: StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
            })
            .collect();
        Self { generators }
    }

    /// Pops whichever flow's next arrival is earliest, returning
    /// `(arrival_ns, packet)`. Never returns `None`: a workload runs forever
    /// until the caller stops pulling from it.
    pub fn pop_next(&mut self) -> (u64, DemoPacket) {
        let idx = self
            .generators
            .iter()
            .enumerate()
            .min_by_key(|(_, g)| g.next_arrival_ns)
            .map(|(i, _)| i)
            .expect("workload must have at least one flow");
        let now = self.generators[idx].next_arrival_ns;
        let packet = self.generators[idx].next(now);
        (now, packet)
    }
}

/// Convenience builder mirroring common benchmark shapes.
pub fn uniform_constant_workload(num_flows: u32, rate_pps: f64, packet_len: u32, seed: u64) -> Workload {
    let flows = (0..num_flows)
        .map(|id| (id, TrafficPattern::Constant { rate_pps }, packet_len, false))
        .collect();
    Workload::new(flows, seed)
}

pub fn one_fat_flow_workload(num_flows: u32, fat_rate_pps: f64, thin_rate_pps: f64, packet_len: u32, seed: u64) -> Workload {
    let mut flows = Vec::new();
    flows.push((0, TrafficPattern::Constant { rate_pps: fat_rate_pps }, packet_len, false));
    for id in 1..num_flows {
        flows.push((id, TrafficPattern::Constant { rate_pps: thin_rate_pps }, packet_len, false));
    }
    Workload::new(flows, seed)
}
