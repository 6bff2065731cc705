/// Number of model copies instantiated per batch when an asset's free list runs dry.
pub const DEFAULT_POOL_CAPACITY: usize = 10;
