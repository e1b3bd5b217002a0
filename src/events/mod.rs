pub mod topology;

pub use topology::{TopologyEvent, TopologyRouter};
