use chrono::Utc;
use serenity::model::id::{ChannelId, MessageId};
use serenity::model::permissions::Permissions;
use tracing::{debug, info, warn};

use crate::error::{BotError, Result};
use crate::gateway::SharedGateway;
use crate::messages;
use crate::model::{Channel, Guild, Overwrite, OverwriteTarget, Role};
use crate::state::SharedEntityCache;

/// A captured role overwrite and the live role it targets
#[derive(Debug, Clone)]
struct LockTarget {
    original: Overwrite,
    role: Role,
}

impl LockTarget {
    fn locked(&self) -> Overwrite {
        Overwrite {
            target: self.original.target,
            allow: self.original.allow.difference(Permissions::SEND_MESSAGES),
            deny: self.original.deny | Permissions::SEND_MESSAGES,
        }
    }
}

/// Temporarily revokes "send messages" on one text channel.
///
/// The overwrites are captured once at creation and unlocking pushes exactly
/// those values back. Two locks on the same channel do not coordinate with
/// each other.
pub struct ChannelLock {
    locked: bool,
    gateway: SharedGateway,
    channel: Channel,
    guild: Guild,
    targets: Vec<LockTarget>,
    notice: Option<MessageId>,
}

impl ChannelLock {
    pub async fn create(
        gateway: SharedGateway,
        cache: &SharedEntityCache,
        channel_id: ChannelId,
    ) -> Result<Self> {
        let (channel, guild) = resolve(cache, channel_id)?;

        let mut targets = Vec::with_capacity(channel.permission_overwrites.len());
        for overwrite in &channel.permission_overwrites {
            let OverwriteTarget::Role(role_id) = overwrite.target else {
                debug!("Skipping member overwrite on channel {}", channel.id);
                continue;
            };
            let role = gateway.get_role(guild.id, role_id).await?;
            targets.push(LockTarget {
                original: *overwrite,
                role,
            });
        }

        Ok(Self {
            locked: false,
            gateway,
            channel,
            guild,
            targets,
            notice: None,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn guild(&self) -> &Guild {
        &self.guild
    }

    /// Overwrites as they were when the lock was created
    pub fn overwrites(&self) -> Vec<Overwrite> {
        self.targets.iter().map(|t| t.original).collect()
    }

    pub fn roles(&self) -> Vec<Role> {
        self.targets.iter().map(|t| t.role.clone()).collect()
    }

    pub fn notice(&self) -> Option<MessageId> {
        self.notice
    }

    /// Clear "send messages" for every captured role, optionally posting a
    /// notice. Already locked is a no-op. A failed push aborts without
    /// rolling back the overwrites pushed before it.
    pub async fn lock(&mut self, alert: bool) -> Result<()> {
        if self.locked {
            debug!("Channel {} already locked", self.channel.id);
            return Ok(());
        }

        for target in &self.targets {
            if let Err(e) = self
                .gateway
                .set_channel_permission(self.channel.id, &target.locked())
                .await
            {
                warn!(
                    "Locking channel {} failed at role {}: {}",
                    self.channel.id, target.role.name, e
                );
                return Err(e);
            }
        }

        if alert {
            let content = messages::lock_notice(&self.channel.name, &self.roles(), Utc::now());
            let message_id = self.gateway.send_message(self.channel.id, &content).await?;
            self.notice = Some(message_id);
        }

        self.locked = true;
        info!(
            "Locked channel {} ({}) for {} roles",
            self.channel.name,
            self.channel.id,
            self.targets.len()
        );
        Ok(())
    }

    /// Restore the captured overwrites and retract the notice.
    ///
    /// The channel counts as unlocked once the overwrites are restored, even
    /// if the notice could not be deleted; that failure is still returned.
    pub async fn unlock(&mut self) -> Result<()> {
        if !self.locked {
            return Err(BotError::NotLocked {
                id: self.channel.id.to_string(),
            });
        }

        for target in &self.targets {
            if let Err(e) = self
                .gateway
                .set_channel_permission(self.channel.id, &target.original)
                .await
            {
                warn!(
                    "Unlocking channel {} failed at role {}: {}",
                    self.channel.id, target.role.name, e
                );
                return Err(e);
            }
        }
        self.locked = false;
        info!("Unlocked channel {} ({})", self.channel.name, self.channel.id);

        if let Some(message_id) = self.notice.take() {
            if let Err(e) = self.gateway.delete_message(self.channel.id, message_id).await {
                warn!("Could not delete lock notice {}: {}", message_id, e);
                return Err(BotError::NoticeCleanup {
                    channel: self.channel.id,
                    message: message_id,
                    source: Box::new(e),
                });
            }
        }
        Ok(())
    }
}

fn resolve(cache: &SharedEntityCache, channel_id: ChannelId) -> Result<(Channel, Guild)> {
    let cache = cache.read();
    let channel = cache
        .find_channel(channel_id)
        .ok_or_else(|| BotError::ChannelNotFound {
            id: channel_id.to_string(),
        })?;

    let guild_id = match channel.guild_id {
        Some(guild_id) if channel.is_text() => guild_id,
        _ => {
            return Err(BotError::BadChannel {
                id: channel_id.to_string(),
                kind: format!("{:?}", channel.kind).to_lowercase(),
            })
        }
    };
    let guild = cache
        .find_guild(guild_id)
        .ok_or_else(|| BotError::GuildNotFound {
            id: guild_id.to_string(),
        })?;

    Ok((channel, guild))
}
