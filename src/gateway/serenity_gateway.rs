use async_trait::async_trait;
use serenity::http::{GuildPagination, Http};
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::sync::Arc;
use tracing::debug;

use super::GatewayClient;
use crate::error::{BotError, Result};
use crate::model::{Channel, Guild, Member, Overwrite, Role};

/// `GatewayClient` backed by serenity's REST client
pub struct SerenityGateway {
    http: Arc<Http>,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    fn http(&self) -> &Http {
        &self.http
    }
}

#[async_trait]
impl GatewayClient for SerenityGateway {
    async fn list_guilds(&self, page_size: u64, after: Option<GuildId>) -> Result<Vec<Guild>> {
        let page = self
            .http()
            .get_guilds(after.map(GuildPagination::After), Some(page_size))
            .await?;
        debug!("Listed {} guilds after {:?}", page.len(), after);
        Ok(page.into_iter().map(Guild::from).collect())
    }

    async fn get_guild(&self, guild_id: GuildId) -> Result<Guild> {
        let guild = guild_id.to_partial_guild(self.http()).await?;
        Ok(Guild::from(guild))
    }

    async fn list_guild_channels(&self, guild_id: GuildId) -> Result<Vec<Channel>> {
        let channels = guild_id.channels(self.http()).await?;

        // The API hands back a map; keep the sidebar order instead
        let mut channels: Vec<Channel> = channels.into_values().map(Channel::from).collect();
        channels.sort_by_key(|c| (c.position, c.id));
        Ok(channels)
    }

    async fn list_private_channels(&self) -> Result<Vec<Channel>> {
        let channels = self.http().get_user_dm_channels().await?;
        Ok(channels.into_iter().map(Channel::from).collect())
    }

    async fn get_role(&self, guild_id: GuildId, role_id: RoleId) -> Result<Role> {
        let mut roles = guild_id.roles(self.http()).await?;
        roles
            .remove(&role_id)
            .map(Role::from)
            .ok_or_else(|| BotError::RoleNotFound {
                id: role_id.to_string(),
            })
    }

    async fn set_channel_permission(
        &self,
        channel_id: ChannelId,
        overwrite: &Overwrite,
    ) -> Result<()> {
        channel_id
            .create_permission(self.http(), overwrite.to_serenity())
            .await?;
        Ok(())
    }

    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<MessageId> {
        let message = channel_id.say(self.http(), content).await?;
        Ok(message.id)
    }

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()> {
        channel_id.delete_message(self.http(), message_id).await?;
        Ok(())
    }

    async fn list_guild_members(
        &self,
        guild_id: GuildId,
        after: Option<UserId>,
        page_size: u64,
    ) -> Result<Vec<Member>> {
        let members = guild_id
            .members(self.http(), Some(page_size), after)
            .await?;
        Ok(members.into_iter().map(Member::from).collect())
    }
}
