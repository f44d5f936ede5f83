#![forbid(unsafe_code)]

pub mod demo;
pub mod qdisc;

pub use qdisc::{Config, ConfigUpdate, EnqueueOutcome, FqCodelQdisc, PacketHandle};

pub mod prelude {
    pub use crate::qdisc::{Clock, Config, ConfigUpdate, EnqueueOutcome, FqCodelQdisc, PacketHandle, StatsSnapshot};
}
