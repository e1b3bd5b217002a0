pub mod general;
pub mod lock;

pub use general::refresh;
pub use lock::{lock, unlock};
