use tracing::debug;

use crate::model::{Channel, Guild};
use crate::state::SharedEntityCache;

/// A topology change delivered by the gateway
#[derive(Debug, Clone)]
pub enum TopologyEvent {
    ChannelCreated(Channel),
    ChannelUpdated(Channel),
    ChannelDeleted(Channel),
    GuildAvailable(Guild),
}

/// Applies topology events to the cache without touching the network.
///
/// Event payloads are trusted as the authoritative channel representation.
#[derive(Clone)]
pub struct TopologyRouter {
    cache: SharedEntityCache,
}

impl TopologyRouter {
    pub fn new(cache: SharedEntityCache) -> Self {
        Self { cache }
    }

    pub fn apply(&self, event: TopologyEvent) {
        match event {
            TopologyEvent::ChannelCreated(channel) | TopologyEvent::ChannelUpdated(channel) => {
                debug!("Upserting channel {} ({})", channel.name, channel.id);
                self.cache.write().upsert_channel(channel);
            }
            TopologyEvent::ChannelDeleted(channel) => {
                let removed = self.cache.write().delete_channel(&channel);
                debug!(
                    "Deleted channel {} (was cached: {})",
                    channel.id,
                    removed.is_some()
                );
            }
            TopologyEvent::GuildAvailable(guild) => {
                let guild_id = guild.id;
                if self.cache.write().insert_guild(guild) {
                    debug!("Guild {} became available", guild_id);
                }
            }
        }
    }

    pub fn on_channel_created(&self, channel: Channel) {
        self.apply(TopologyEvent::ChannelCreated(channel));
    }

    pub fn on_channel_updated(&self, channel: Channel) {
        self.apply(TopologyEvent::ChannelUpdated(channel));
    }

    pub fn on_channel_deleted(&self, channel: Channel) {
        self.apply(TopologyEvent::ChannelDeleted(channel));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::{guild, text_channel};
    use crate::state::create_shared_entity_cache;
    use crate::state::entity_cache::assert_links_consistent;
    use serenity::model::id::{ChannelId, GuildId};

    fn router() -> (SharedEntityCache, TopologyRouter) {
        let cache = create_shared_entity_cache();
        {
            let mut cache = cache.write();
            cache.merge_guilds(vec![guild(1, "One")]);
            cache.insert_links(GuildId::new(1), vec![text_channel(10, 1, "general", vec![])]);
        }
        let router = TopologyRouter::new(cache.clone());
        (cache, router)
    }

    #[test]
    fn test_events_apply_in_delivery_order() {
        let (cache, router) = router();

        router.on_channel_created(text_channel(11, 1, "new", vec![]));
        router.on_channel_updated(text_channel(11, 1, "renamed", vec![]));
        router.on_channel_deleted(text_channel(10, 1, "general", vec![]));

        let cache = cache.read();
        assert_eq!(cache.find_channel(ChannelId::new(11)).unwrap().name, "renamed");
        assert!(cache.find_channel(ChannelId::new(10)).is_none());
        assert_eq!(cache.linked_channels(GuildId::new(1)).len(), 1);
        assert_links_consistent(&cache);
    }

    #[test]
    fn test_unknown_guild_self_heals() {
        let (cache, router) = router();

        router.on_channel_created(text_channel(30, 3, "orphan", vec![]));

        assert_eq!(
            cache
                .read()
                .find_guild_id_for_channel(ChannelId::new(30))
                .unwrap(),
            GuildId::new(3)
        );
    }

    #[test]
    fn test_guild_available_does_not_replace() {
        let (cache, router) = router();

        router.apply(TopologyEvent::GuildAvailable(guild(1, "Renamed")));
        router.apply(TopologyEvent::GuildAvailable(guild(2, "Two")));

        let cache = cache.read();
        assert_eq!(cache.find_guild(GuildId::new(1)).unwrap().name, "One");
        assert!(cache.find_guild(GuildId::new(2)).is_some());
        assert_eq!(cache.unresolved_link_guilds().unwrap(), vec![GuildId::new(2)]);
    }
}
