use crate::qdisc::error::ConfigError;

pub const MIN_FLOWS_CNT: u32 = 1;
pub const MAX_FLOWS_CNT: u32 = 65_536;
pub const DEFAULT_FLOWS_CNT: u32 = 1024;

pub const MIN_QUANTUM: u32 = 256;
pub const DEFAULT_QUANTUM: u32 = 1500; // device MTU, ethernet default

pub const MIN_DROP_BATCH_SIZE: u32 = 1;
pub const DEFAULT_DROP_BATCH_SIZE: u32 = 64;

pub const MAX_MEMORY_LIMIT: u64 = 1 << 31;
pub const DEFAULT_MEMORY_LIMIT: u64 = 32 * 1024 * 1024;

pub const DEFAULT_TARGET_US: u32 = 5_000;
pub const DEFAULT_INTERVAL_US: u32 = 100_000;
pub const DEFAULT_LIMIT: u32 = 10_240;

/// Every scheduler knob, with defaults matching the upstream fq_codel
/// parameter set. `flows_cnt` is write-once: it is consumed at
/// [`crate::qdisc::scheduler::FqCodelQdisc::try_new`] and cannot change
/// after that without rebuilding the scheduler.
#[derive(Debug, Clone)]
pub struct Config {
    flows_cnt: u32,
    pub target_us: u32,
    pub interval_us: u32,
    pub ce_threshold_us: Option<u32>,
    pub ecn_enable: bool,
    pub limit: u32,
    pub memory_limit: u64,
    pub quantum: u32,
    pub drop_batch_size: u32,
}

impl Config {
    /// Validates `flows_cnt` and builds a config with sane defaults for
    /// everything else.
    pub fn new(flows_cnt: u32) -> Result<Self, ConfigError> {
        if !(MIN_FLOWS_CNT..=MAX_FLOWS_CNT).contains(&flows_cnt) {
            return Err(ConfigError::FlowsCountOutOfRange(flows_cnt));
        }
        Ok(Self {
            flows_cnt,
            target_us: DEFAULT_TARGET_US,
            interval_us: DEFAULT_INTERVAL_US,
            ce_threshold_us: None,
            ecn_enable: false,
            limit: DEFAULT_LIMIT,
            memory_limit: DEFAULT_MEMORY_LIMIT,
            quantum: DEFAULT_QUANTUM,
            drop_batch_size: DEFAULT_DROP_BATCH_SIZE,
        })
    }

    pub fn flows_cnt(&self) -> u32 {
        self.flows_cnt
    }

    /// Applies a partial update, clamping and validating per §4.8/§6.
    /// `flows_cnt` is rejected outright since the flow table is fixed-size
    /// for the scheduler's lifetime (no dynamic resizing, per scope).
    pub fn apply(&mut self, update: ConfigUpdate) -> Result<(), ConfigError> {
        if let Some(requested) = update.flows_cnt {
            if requested != self.flows_cnt {
                return Err(ConfigError::FlowsCountAlreadySet(self.flows_cnt));
            }
        }
        if let Some(memory_limit) = update.memory_limit {
            if memory_limit > MAX_MEMORY_LIMIT {
                return Err(ConfigError::MemoryLimitExceedsMax(memory_limit));
            }
        }

        if let Some(v) = update.target_us {
            self.target_us = v;
        }
        if let Some(v) = update.interval_us {
            self.interval_us = v;
        }
        if let Some(v) = update.ce_threshold_us {
            self.ce_threshold_us = v;
        }
        if let Some(v) = update.ecn_enable {
            self.ecn_enable = v;
        }
        if let Some(v) = update.limit {
            self.limit = v;
        }
        if let Some(v) = update.memory_limit {
            self.memory_limit = v;
        }
        if let Some(v) = update.quantum {
            // the source's inverted clamp would have been min(1, v); this
            // is the corrected direction: quantum never shrinks below the
            // configured floor.
            self.quantum = v.max(MIN_QUANTUM);
        }
        if let Some(v) = update.drop_batch_size {
            self.drop_batch_size = v.max(MIN_DROP_BATCH_SIZE);
        }

        Ok(())
    }
}

/// A partial bundle of configuration changes for [`Config::apply`].
/// `ce_threshold_us` is `Option<Option<u32>>` so a caller can both leave it
/// untouched (`None`) and explicitly clear it (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub target_us: Option<u32>,
    pub interval_us: Option<u32>,
    pub ce_threshold_us: Option<Option<u32>>,
    pub ecn_enable: Option<bool>,
    pub limit: Option<u32>,
    pub memory_limit: Option<u64>,
    pub flows_cnt: Option<u32>,
    pub quantum: Option<u32>,
    pub drop_batch_size: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_flows_cnt() {
        assert!(Config::new(0).is_err());
        assert!(Config::new(MAX_FLOWS_CNT + 1).is_err());
        assert!(Config::new(1).is_ok());
        assert!(Config::new(MAX_FLOWS_CNT).is_ok());
    }

    #[test]
    fn quantum_clamps_up_not_down() {
        let mut cfg = Config::new(1024).unwrap();
        cfg.apply(ConfigUpdate {
            quantum: Some(10),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(cfg.quantum, MIN_QUANTUM);
    }

    #[test]
    fn drop_batch_size_clamps_to_at_least_one() {
        let mut cfg = Config::new(1024).unwrap();
        cfg.apply(ConfigUpdate {
            drop_batch_size: Some(0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(cfg.drop_batch_size, 1);
    }

    #[test]
    fn flows_cnt_is_write_once() {
        let mut cfg = Config::new(1024).unwrap();
        let err = cfg
            .apply(ConfigUpdate {
                flows_cnt: Some(2048),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, ConfigError::FlowsCountAlreadySet(1024));
    }

    #[test]
    fn memory_limit_rejects_over_ceiling() {
        let mut cfg = Config::new(1024).unwrap();
        let err = cfg
            .apply(ConfigUpdate {
                memory_limit: Some(MAX_MEMORY_LIMIT + 1),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, ConfigError::MemoryLimitExceedsMax(MAX_MEMORY_LIMIT + 1));
    }
}
