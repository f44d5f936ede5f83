//! Fair-queue CoDel scheduler with a cuckoo-hashed flow-identity table.
//!
//! This is the egress-path queueing discipline: packets arrive through
//! [`FqCodelQdisc::enqueue`], get classified into one of a fixed number of
//! per-flow queues by [`cuckoo`], sit under per-flow [`codel`] active queue
//! management, and leave through [`FqCodelQdisc::dequeue`] in deficit
//! round-robin order. [`overload`] handles what happens when a flow grows
//! too fat for the configured limits.

pub mod clock;
pub mod codel;
pub mod config;
pub mod control;
pub mod cuckoo;
pub mod error;
pub mod flow;
pub mod free_slots;
pub mod overload;
pub mod packet;
pub mod scheduler;
pub mod shared;
pub mod stats;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{Config, ConfigUpdate};
pub use error::{ConfigError, InitError};
pub use packet::PacketHandle;
pub use scheduler::{EnqueueOutcome, ExternalVerdict, FlowView, FqCodelQdisc};
pub use shared::SharedQdisc;
pub use stats::StatsSnapshot;
