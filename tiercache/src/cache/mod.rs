//! Cache Module
//!
//! Composes single levels into a tiered cache:
//! - Tier: lockable level behind the `CacheTier` seam
//! - MultiLevel: fastest-first probing with promotion and write fan-out
//! - Sweeper: background TTL purge with an explicit stop

pub mod multi_level;
pub mod sweeper;
pub mod tier;

pub use multi_level::{MultiLevelCache, MultiLevelStats};
pub use sweeper::{ExpirySweeper, Sweep};
pub use tier::{CacheTier, SharedLevel};
