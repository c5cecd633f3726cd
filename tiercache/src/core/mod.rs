pub mod clock;
pub mod error;
pub mod level;
pub mod policy;
pub mod tag_index;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, Result};
pub use level::SingleLevelCache;
pub use policy::{EvictionPolicy, LruPolicy};
pub use tag_index::TagIndex;
pub use types::{Entry, Hit, LevelStats, TagSet, tag_set};
