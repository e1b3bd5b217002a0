// src/model.rs
//! Plain value types mirrored from the gateway.
//!
//! These are deliberately smaller than serenity's models: the cache only keeps
//! what the sync engine and the channel lock need, and every value is cheap to
//! clone into a snapshot.

use serde::{Deserialize, Serialize};
use serenity::model::channel::{
    ChannelType, GuildChannel, PermissionOverwrite, PermissionOverwriteType, PrivateChannel,
};
use serenity::model::guild::{GuildInfo, Member as SerenityMember, PartialGuild, Role as SerenityRole};
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use serenity::model::permissions::Permissions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: GuildId,
    pub name: String,
    /// Unknown when the guild was only seen in a guild listing page
    pub owner_id: Option<UserId>,
}

impl From<PartialGuild> for Guild {
    fn from(guild: PartialGuild) -> Self {
        Self {
            id: guild.id,
            name: guild.name,
            owner_id: Some(guild.owner_id),
        }
    }
}

impl From<&serenity::model::guild::Guild> for Guild {
    fn from(guild: &serenity::model::guild::Guild) -> Self {
        Self {
            id: guild.id,
            name: guild.name.clone(),
            owner_id: Some(guild.owner_id),
        }
    }
}

impl From<GuildInfo> for Guild {
    fn from(info: GuildInfo) -> Self {
        Self {
            id: info.id,
            name: info.name,
            owner_id: None,
        }
    }
}

/// Who a permission overwrite applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverwriteTarget {
    Role(RoleId),
    Member(UserId),
}

/// A per-target permission exception on a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overwrite {
    pub target: OverwriteTarget,
    pub allow: Permissions,
    pub deny: Permissions,
}

impl Overwrite {
    pub fn role(role_id: RoleId, allow: Permissions, deny: Permissions) -> Self {
        Self {
            target: OverwriteTarget::Role(role_id),
            allow,
            deny,
        }
    }

    /// Convert from serenity, dropping overwrite kinds we do not model
    pub fn from_serenity(overwrite: &PermissionOverwrite) -> Option<Self> {
        let target = match overwrite.kind {
            PermissionOverwriteType::Role(id) => OverwriteTarget::Role(id),
            PermissionOverwriteType::Member(id) => OverwriteTarget::Member(id),
            _ => return None,
        };
        Some(Self {
            target,
            allow: overwrite.allow,
            deny: overwrite.deny,
        })
    }

    pub fn to_serenity(&self) -> PermissionOverwrite {
        let kind = match self.target {
            OverwriteTarget::Role(id) => PermissionOverwriteType::Role(id),
            OverwriteTarget::Member(id) => PermissionOverwriteType::Member(id),
        };
        PermissionOverwrite {
            allow: self.allow,
            deny: self.deny,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    /// `None` for private (DM) channels
    pub guild_id: Option<GuildId>,
    pub name: String,
    pub kind: ChannelType,
    pub position: u16,
    pub permission_overwrites: Vec<Overwrite>,
}

impl Channel {
    pub fn is_text(&self) -> bool {
        self.kind == ChannelType::Text
    }
}

impl From<GuildChannel> for Channel {
    fn from(channel: GuildChannel) -> Self {
        Self::from(&channel)
    }
}

impl From<&GuildChannel> for Channel {
    fn from(channel: &GuildChannel) -> Self {
        Self {
            id: channel.id,
            guild_id: Some(channel.guild_id),
            name: channel.name.clone(),
            kind: channel.kind,
            position: channel.position,
            permission_overwrites: channel
                .permission_overwrites
                .iter()
                .filter_map(Overwrite::from_serenity)
                .collect(),
        }
    }
}

impl From<PrivateChannel> for Channel {
    fn from(channel: PrivateChannel) -> Self {
        Self {
            id: channel.id,
            guild_id: None,
            name: channel.recipient.name,
            kind: channel.kind,
            position: 0,
            permission_overwrites: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub permissions: Permissions,
}

impl From<SerenityRole> for Role {
    fn from(role: SerenityRole) -> Self {
        Self {
            id: role.id,
            name: role.name,
            permissions: role.permissions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: UserId,
    pub username: String,
    pub nick: Option<String>,
}

impl Member {
    /// Case-insensitive match against the username or the guild nickname
    pub fn matches_name(&self, name: &str) -> bool {
        self.username.eq_ignore_ascii_case(name)
            || self
                .nick
                .as_deref()
                .is_some_and(|nick| nick.eq_ignore_ascii_case(name))
    }
}

impl From<SerenityMember> for Member {
    fn from(member: SerenityMember) -> Self {
        Self {
            user_id: member.user.id,
            username: member.user.name,
            nick: member.nick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_messages_bit_value() {
        assert_eq!(Permissions::SEND_MESSAGES.bits(), 2048);
    }

    #[test]
    fn test_overwrite_serenity_conversion() {
        let overwrite = Overwrite::role(
            RoleId::new(10),
            Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
            Permissions::empty(),
        );

        let converted = overwrite.to_serenity();
        assert_eq!(converted.kind, PermissionOverwriteType::Role(RoleId::new(10)));
        assert_eq!(Overwrite::from_serenity(&converted), Some(overwrite));
    }

    #[test]
    fn test_member_name_matching() {
        let member = Member {
            user_id: UserId::new(1),
            username: "alice".to_string(),
            nick: Some("Ali".to_string()),
        };

        assert!(member.matches_name("ALICE"));
        assert!(member.matches_name("ali"));
        assert!(!member.matches_name("bob"));
    }
}
