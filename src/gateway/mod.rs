//! The gateway capability consumed by the cache, the sync engine and the
//! channel lock.
//!
//! Every call is a network round trip from the caller's point of view.
//! Timeouts and rate limits are the implementation's business and surface as
//! ordinary errors.

pub mod serenity_gateway;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::sync::Arc;

use crate::error::Result;
use crate::model::{Channel, Guild, Member, Overwrite, Role};

pub use serenity_gateway::SerenityGateway;

#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// One page of the guilds visible to the bot, after the given cursor
    async fn list_guilds(&self, page_size: u64, after: Option<GuildId>) -> Result<Vec<Guild>>;

    async fn get_guild(&self, guild_id: GuildId) -> Result<Guild>;

    async fn list_guild_channels(&self, guild_id: GuildId) -> Result<Vec<Channel>>;

    async fn list_private_channels(&self) -> Result<Vec<Channel>>;

    async fn get_role(&self, guild_id: GuildId, role_id: RoleId) -> Result<Role>;

    async fn set_channel_permission(&self, channel_id: ChannelId, overwrite: &Overwrite)
        -> Result<()>;

    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<MessageId>;

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()>;

    async fn list_guild_members(
        &self,
        guild_id: GuildId,
        after: Option<UserId>,
        page_size: u64,
    ) -> Result<Vec<Member>>;
}

/// Shared gateway handle
pub type SharedGateway = Arc<dyn GatewayClient>;
