pub mod channel_lock;
pub mod members;
pub mod sync_engine;

pub use channel_lock::ChannelLock;
pub use members::find_member;
pub use sync_engine::{Dimension, Dimensions, SyncEngine};
