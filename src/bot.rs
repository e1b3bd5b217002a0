//! The bot core handed to the lifecycle glue.
//!
//! `Bot` owns the entity cache and wires the sync engine, the topology router
//! and channel locks to one gateway. Several bots can coexist in a process;
//! there is no global state.

use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::events::{TopologyEvent, TopologyRouter};
use crate::gateway::SharedGateway;
use crate::managers::{find_member, ChannelLock, Dimensions, SyncEngine};
use crate::model::{Channel, Guild, Member};
use crate::state::{create_shared_entity_cache, Connections, SharedEntityCache};

pub struct Bot {
    gateway: SharedGateway,
    cache: SharedEntityCache,
    sync: SyncEngine,
    router: TopologyRouter,
}

impl Bot {
    pub fn new(gateway: SharedGateway) -> Self {
        let cache = create_shared_entity_cache();
        Self {
            sync: SyncEngine::new(gateway.clone(), cache.clone()),
            router: TopologyRouter::new(cache.clone()),
            gateway,
            cache,
        }
    }

    pub async fn refresh(&self, dimensions: impl Into<Dimensions>) -> Result<()> {
        self.sync.refresh(dimensions).await
    }

    pub async fn refresh_all(&self) -> Result<()> {
        self.sync.refresh_all().await
    }

    /// Refresh everything, then return a snapshot
    pub async fn connections(&self) -> Result<Connections> {
        self.refresh_all().await?;
        Ok(self.snapshot())
    }

    /// Refresh everything and select the main guild and channel
    pub async fn reset_connections(&self) -> Result<GuildId> {
        self.refresh_all().await?;
        let guild_id = self.cache.write().reset_main()?;
        info!(
            "Main guild {} selected, main channel {:?}",
            guild_id,
            self.main_channel()
        );
        Ok(guild_id)
    }

    pub fn snapshot(&self) -> Connections {
        self.cache.read().snapshot()
    }

    pub fn private_channels(&self) -> Vec<Channel> {
        self.cache.read().private_channels()
    }

    pub fn find_channel(&self, channel_id: ChannelId) -> Option<Channel> {
        self.cache.read().find_channel(channel_id)
    }

    pub fn find_guild(&self, guild_id: GuildId) -> Option<Guild> {
        self.cache.read().find_guild(guild_id)
    }

    pub fn find_guild_id_for_channel(&self, channel_id: ChannelId) -> Result<GuildId> {
        self.cache.read().find_guild_id_for_channel(channel_id)
    }

    pub fn main_guild(&self) -> Option<GuildId> {
        self.cache.read().main_guild()
    }

    pub fn main_channel(&self) -> Option<ChannelId> {
        self.cache.read().main_channel()
    }

    pub fn set_main_channel(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        self.cache.write().set_main_channel(guild_id, channel_id)
    }

    pub fn on_topology_event(&self, event: TopologyEvent) {
        self.router.apply(event);
    }

    pub fn on_channel_created(&self, channel: Channel) {
        self.router.on_channel_created(channel);
    }

    pub fn on_channel_updated(&self, channel: Channel) {
        self.router.on_channel_updated(channel);
    }

    pub fn on_channel_deleted(&self, channel: Channel) {
        self.router.on_channel_deleted(channel);
    }

    pub async fn channel_lock(&self, channel_id: ChannelId) -> Result<ChannelLock> {
        ChannelLock::create(self.gateway.clone(), &self.cache, channel_id).await
    }

    pub async fn find_member(&self, guild_id: GuildId, name: &str) -> Result<Member> {
        find_member(self.gateway.as_ref(), guild_id, name).await
    }
}

/// Shared bot type
pub type SharedBot = Arc<Bot>;
