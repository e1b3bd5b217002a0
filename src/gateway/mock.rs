//! In-memory gateway used by the unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::channel::ChannelType;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use serenity::model::permissions::Permissions;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;

use super::GatewayClient;
use crate::error::{BotError, Result};
use crate::model::{Channel, Guild, Member, Overwrite, Role};

/// A recorded gateway call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListGuilds { after: Option<GuildId> },
    GetGuild(GuildId),
    ListGuildChannels(GuildId),
    ListPrivateChannels,
    GetRole(RoleId),
    SetPermission(ChannelId, Overwrite),
    SendMessage(ChannelId, String),
    DeleteMessage(ChannelId, MessageId),
    ListGuildMembers { after: Option<UserId> },
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Call::SetPermission(..) | Call::SendMessage(..) | Call::DeleteMessage(..)
        )
    }
}

pub struct MockGateway {
    guilds: Mutex<Vec<Guild>>,
    channels: Mutex<HashMap<GuildId, Vec<Channel>>>,
    private: Mutex<Vec<Channel>>,
    roles: Mutex<HashMap<RoleId, Role>>,
    members: Mutex<HashMap<GuildId, Vec<Member>>>,
    calls: Mutex<Vec<Call>>,
    /// Zero-based index of the set_channel_permission call that fails
    fail_permission_at: Mutex<Option<usize>>,
    permission_attempts: AtomicU64,
    fail_channels_for: Mutex<HashSet<GuildId>>,
    fail_send: AtomicBool,
    fail_delete: AtomicBool,
    next_message: AtomicU64,
    /// The next channel listing parks until `resume` is called
    pause_channels: AtomicBool,
    paused: Notify,
    resumed: Notify,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self {
            guilds: Mutex::new(Vec::new()),
            channels: Mutex::new(HashMap::new()),
            private: Mutex::new(Vec::new()),
            roles: Mutex::new(HashMap::new()),
            members: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_permission_at: Mutex::new(None),
            permission_attempts: AtomicU64::new(0),
            fail_channels_for: Mutex::new(HashSet::new()),
            fail_send: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            next_message: AtomicU64::new(1000),
            pause_channels: AtomicBool::new(false),
            paused: Notify::new(),
            resumed: Notify::new(),
        }
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_guild(self, guild: Guild, channels: Vec<Channel>) -> Self {
        self.channels.lock().insert(guild.id, channels);
        self.guilds.lock().push(guild);
        self
    }

    pub fn with_role(self, role: Role) -> Self {
        self.roles.lock().insert(role.id, role);
        self
    }

    pub fn with_private(self, channel: Channel) -> Self {
        self.private.lock().push(channel);
        self
    }

    pub fn with_members(self, guild_id: GuildId, members: Vec<Member>) -> Self {
        self.members.lock().insert(guild_id, members);
        self
    }

    pub fn set_channels(&self, guild_id: GuildId, channels: Vec<Channel>) {
        self.channels.lock().insert(guild_id, channels);
    }

    pub fn fail_permission_at(&self, index: usize) {
        *self.fail_permission_at.lock() = Some(index);
        self.permission_attempts.store(0, Ordering::SeqCst);
    }

    pub fn fail_channels_for(&self, guild_id: GuildId) {
        self.fail_channels_for.lock().insert(guild_id);
    }

    pub fn fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn pause_next_channel_listing(&self) {
        self.pause_channels.store(true, Ordering::SeqCst);
    }

    /// Wait until a channel listing is parked inside the gateway
    pub async fn wait_until_paused(&self) {
        self.paused.notified().await;
    }

    pub fn resume(&self) {
        self.resumed.notify_one();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Overwrites as currently stored on the "remote" side
    pub fn remote_overwrites(&self, channel_id: ChannelId) -> Vec<Overwrite> {
        self.channels
            .lock()
            .values()
            .flatten()
            .find(|c| c.id == channel_id)
            .map(|c| c.permission_overwrites.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn upstream(message: &str) -> BotError {
        BotError::Discord {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl GatewayClient for MockGateway {
    async fn list_guilds(&self, page_size: u64, after: Option<GuildId>) -> Result<Vec<Guild>> {
        self.record(Call::ListGuilds { after });
        let mut guilds = self.guilds.lock().clone();
        guilds.sort_by_key(|g| g.id);
        Ok(guilds
            .into_iter()
            .filter(|g| after.map_or(true, |cursor| g.id > cursor))
            .take(page_size as usize)
            .map(|g| Guild {
                owner_id: None,
                ..g
            })
            .collect())
    }

    async fn get_guild(&self, guild_id: GuildId) -> Result<Guild> {
        self.record(Call::GetGuild(guild_id));
        self.guilds
            .lock()
            .iter()
            .find(|g| g.id == guild_id)
            .cloned()
            .ok_or_else(|| BotError::GuildNotFound {
                id: guild_id.to_string(),
            })
    }

    async fn list_guild_channels(&self, guild_id: GuildId) -> Result<Vec<Channel>> {
        self.record(Call::ListGuildChannels(guild_id));
        if self.pause_channels.swap(false, Ordering::SeqCst) {
            self.paused.notify_one();
            self.resumed.notified().await;
        }
        if self.fail_channels_for.lock().contains(&guild_id) {
            return Err(Self::upstream("channel listing failed"));
        }
        Ok(self
            .channels
            .lock()
            .get(&guild_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_private_channels(&self) -> Result<Vec<Channel>> {
        self.record(Call::ListPrivateChannels);
        Ok(self.private.lock().clone())
    }

    async fn get_role(&self, _guild_id: GuildId, role_id: RoleId) -> Result<Role> {
        self.record(Call::GetRole(role_id));
        self.roles
            .lock()
            .get(&role_id)
            .cloned()
            .ok_or_else(|| BotError::RoleNotFound {
                id: role_id.to_string(),
            })
    }

    async fn set_channel_permission(
        &self,
        channel_id: ChannelId,
        overwrite: &Overwrite,
    ) -> Result<()> {
        self.record(Call::SetPermission(channel_id, *overwrite));
        let attempt = self.permission_attempts.fetch_add(1, Ordering::SeqCst) as usize;
        if *self.fail_permission_at.lock() == Some(attempt) {
            return Err(Self::upstream("permission update failed"));
        }

        let mut channels = self.channels.lock();
        if let Some(channel) = channels.values_mut().flatten().find(|c| c.id == channel_id) {
            match channel
                .permission_overwrites
                .iter_mut()
                .find(|o| o.target == overwrite.target)
            {
                Some(existing) => *existing = *overwrite,
                None => channel.permission_overwrites.push(*overwrite),
            }
        }
        Ok(())
    }

    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<MessageId> {
        self.record(Call::SendMessage(channel_id, content.to_string()));
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(Self::upstream("send failed"));
        }
        Ok(MessageId::new(self.next_message.fetch_add(1, Ordering::SeqCst)))
    }

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()> {
        self.record(Call::DeleteMessage(channel_id, message_id));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::upstream("delete failed"));
        }
        Ok(())
    }

    async fn list_guild_members(
        &self,
        guild_id: GuildId,
        after: Option<UserId>,
        page_size: u64,
    ) -> Result<Vec<Member>> {
        self.record(Call::ListGuildMembers { after });
        let mut members = self
            .members
            .lock()
            .get(&guild_id)
            .cloned()
            .unwrap_or_default();
        members.sort_by_key(|m| m.user_id);
        Ok(members
            .into_iter()
            .filter(|m| after.map_or(true, |cursor| m.user_id > cursor))
            .take(page_size as usize)
            .collect())
    }
}

pub fn guild(id: u64, name: &str) -> Guild {
    Guild {
        id: GuildId::new(id),
        name: name.to_string(),
        owner_id: Some(UserId::new(1)),
    }
}

pub fn text_channel(id: u64, guild_id: u64, name: &str, overwrites: Vec<Overwrite>) -> Channel {
    Channel {
        id: ChannelId::new(id),
        guild_id: Some(GuildId::new(guild_id)),
        name: name.to_string(),
        kind: ChannelType::Text,
        position: 0,
        permission_overwrites: overwrites,
    }
}

pub fn voice_channel(id: u64, guild_id: u64, name: &str) -> Channel {
    Channel {
        kind: ChannelType::Voice,
        ..text_channel(id, guild_id, name, Vec::new())
    }
}

pub fn dm_channel(id: u64, name: &str) -> Channel {
    Channel {
        id: ChannelId::new(id),
        guild_id: None,
        name: name.to_string(),
        kind: ChannelType::Private,
        position: 0,
        permission_overwrites: Vec::new(),
    }
}

/// The guild's `@everyone` role shares the guild id
pub fn everyone(guild_id: u64) -> Role {
    Role {
        id: RoleId::new(guild_id),
        name: "@everyone".to_string(),
        permissions: Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
    }
}
