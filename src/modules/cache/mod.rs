pub mod coalescing_cache;
pub mod entry;
pub mod policy;
pub mod stats;

pub use coalescing_cache::CoalescingCache;
pub use entry::EntryState;
pub use policy::{CacheDirective, CachePolicy};
pub use stats::CacheStats;
