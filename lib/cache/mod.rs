/// Block cache with single-flight fetch coordination.
pub mod blocks;
/// Cache eviction policies.
pub mod eviction;

pub use blocks::BlockCache;
pub use eviction::{EvictionPolicy, ForwardSweep};
