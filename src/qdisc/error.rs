use thiserror::Error;

/// Control-plane failures. None of these mutate scheduler state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("flows_cnt is write-once and has already been set to {0}")]
    FlowsCountAlreadySet(u32),

    #[error("flows_cnt {0} is out of range [1, 65536]")]
    FlowsCountOutOfRange(u32),

    #[error("memory_limit {0} exceeds the 2^31 ceiling")]
    MemoryLimitExceedsMax(u64),
}

/// Initialisation failures. The scheduler is left fully unconstructed;
/// there is no partially-initialised state to unwind.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("allocation failed while sizing the scheduler: {0}")]
    Allocation(#[from] std::collections::TryReserveError),
}
