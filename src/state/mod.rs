pub mod entity_cache;

pub use entity_cache::{
    create_shared_entity_cache, Connections, EntityCache, SharedEntityCache,
};
