use parking_lot::RwLock;
use serde::Serialize;
use serenity::model::id::{ChannelId, GuildId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{BotError, Result};
use crate::model::{Channel, Guild};

/// In-memory mirror of the guild/channel topology visible to the bot.
///
/// `guilds` and `links` are `None` until they are first populated, which keeps
/// "never loaded" distinguishable from "loaded and empty". Link entries hold
/// channel ids only; the channel values live in the flat `channels` set.
#[derive(Debug, Default)]
pub struct EntityCache {
    guilds: Option<Vec<Guild>>,
    channels: Vec<Channel>,
    links: Option<HashMap<GuildId, Vec<ChannelId>>>,
    private: Vec<Channel>,
    main_guild: Option<GuildId>,
    main_channel: Option<ChannelId>,
}

/// Point-in-time copy of the cache handed out to callers
#[derive(Debug, Clone, Default, Serialize)]
pub struct Connections {
    pub links: HashMap<GuildId, Vec<Channel>>,
    pub guilds: Vec<Guild>,
    pub channels: Vec<Channel>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guilds_loaded(&self) -> bool {
        self.guilds.is_some()
    }

    pub fn links_loaded(&self) -> bool {
        self.links.is_some()
    }

    pub fn is_known_guild(&self, guild_id: GuildId) -> bool {
        self.guilds
            .as_ref()
            .is_some_and(|guilds| guilds.iter().any(|g| g.id == guild_id))
    }

    /// Ids of every known guild, in insertion order
    pub fn guild_ids(&self) -> Result<Vec<GuildId>> {
        self.guilds
            .as_ref()
            .map(|guilds| guilds.iter().map(|g| g.id).collect())
            .ok_or(BotError::GuildsNotLoaded)
    }

    /// Known guilds that do not have a link entry yet
    pub fn unresolved_link_guilds(&self) -> Result<Vec<GuildId>> {
        let guild_ids = self.guild_ids()?;
        Ok(match &self.links {
            None => guild_ids,
            Some(links) => guild_ids
                .into_iter()
                .filter(|id| !links.contains_key(id))
                .collect(),
        })
    }

    /// Merge guilds by id. Existing entries are left untouched.
    /// Returns the number of guilds appended.
    pub fn merge_guilds(&mut self, incoming: Vec<Guild>) -> usize {
        let guilds = self.guilds.get_or_insert_with(Vec::new);
        let mut added = 0;
        for guild in incoming {
            if !guilds.iter().any(|g| g.id == guild.id) {
                debug!("Caching guild {} ({})", guild.name, guild.id);
                guilds.push(guild);
                added += 1;
            }
        }
        added
    }

    /// Insert a single guild if it is not known yet
    pub fn insert_guild(&mut self, guild: Guild) -> bool {
        self.merge_guilds(vec![guild]) == 1
    }

    /// Append-only merge of fetched guild channels, first seen wins.
    ///
    /// When the link table is populated, newly appended channels are also
    /// linked to their guild.
    pub fn merge_channels(&mut self, incoming: Vec<Channel>) -> usize {
        let mut added = 0;
        for channel in incoming {
            if self.channels.iter().any(|c| c.id == channel.id) {
                continue;
            }
            if let (Some(links), Some(guild_id)) = (self.links.as_mut(), channel.guild_id) {
                link(links.entry(guild_id).or_default(), channel.id);
            }
            self.channels.push(channel);
            added += 1;
        }
        added
    }

    /// Populate (or extend) the link entry for one guild from a full fetch of
    /// its channels. Fetched channels missing from the flat set are appended
    /// to it, and flat-set channels of this guild are kept linked.
    pub fn insert_links(&mut self, guild_id: GuildId, fetched: Vec<Channel>) {
        let links = self.links.get_or_insert_with(HashMap::new);
        let entry = links.entry(guild_id).or_default();

        for channel in fetched {
            link(entry, channel.id);
            if !self.channels.iter().any(|c| c.id == channel.id) {
                self.channels.push(channel);
            }
        }
        for channel in self
            .channels
            .iter()
            .filter(|c| c.guild_id == Some(guild_id))
        {
            link(entry, channel.id);
        }
        debug!("Linked {} channels to guild {}", entry.len(), guild_id);
    }

    /// Mark the link table as populated, even if no guild needed resolving
    pub fn ensure_links(&mut self) {
        self.links.get_or_insert_with(HashMap::new);
    }

    /// Append-only merge into the private channel set
    pub fn merge_private(&mut self, incoming: Vec<Channel>) -> usize {
        let mut added = 0;
        for channel in incoming {
            if !self.private.iter().any(|c| c.id == channel.id) {
                self.private.push(channel);
                added += 1;
            }
        }
        added
    }

    /// Replace a channel by id (or append it), keeping the link table in step.
    /// Before the first links refresh only the flat set changes, so that
    /// refresh still resolves the channel's guild in full.
    pub fn upsert_channel(&mut self, channel: Channel) {
        let previous_guild = match self.channels.iter_mut().find(|c| c.id == channel.id) {
            Some(existing) => {
                let previous = existing.guild_id;
                *existing = channel.clone();
                previous
            }
            None => {
                self.channels.push(channel.clone());
                None
            }
        };

        let Some(links) = self.links.as_mut() else {
            return;
        };
        if let Some(old_guild) = previous_guild.filter(|g| Some(*g) != channel.guild_id) {
            if let Some(entry) = links.get_mut(&old_guild) {
                entry.retain(|id| *id != channel.id);
            }
        }
        if let Some(guild_id) = channel.guild_id {
            link(links.entry(guild_id).or_default(), channel.id);
        }
    }

    /// Remove a channel from the flat set and from its guild's link entry.
    /// An emptied link entry stays present.
    pub fn delete_channel(&mut self, channel: &Channel) -> Option<Channel> {
        let removed = self
            .channels
            .iter()
            .position(|c| c.id == channel.id)
            .map(|index| self.channels.swap_remove(index));

        let guild_id = removed
            .as_ref()
            .and_then(|c| c.guild_id)
            .or(channel.guild_id);
        if let (Some(links), Some(guild_id)) = (self.links.as_mut(), guild_id) {
            if let Some(entry) = links.get_mut(&guild_id) {
                entry.retain(|id| *id != channel.id);
            }
        }

        if self.main_channel == Some(channel.id) {
            self.main_channel = None;
        }
        removed
    }

    pub fn find_channel(&self, channel_id: ChannelId) -> Option<Channel> {
        self.channels
            .iter()
            .chain(self.private.iter())
            .find(|c| c.id == channel_id)
            .cloned()
    }

    pub fn find_guild(&self, guild_id: GuildId) -> Option<Guild> {
        self.guilds
            .as_ref()?
            .iter()
            .find(|g| g.id == guild_id)
            .cloned()
    }

    pub fn find_guild_id_for_channel(&self, channel_id: ChannelId) -> Result<GuildId> {
        let links = self.links.as_ref().ok_or(BotError::LinksNotLoaded)?;
        links
            .iter()
            .find(|(_, ids)| ids.contains(&channel_id))
            .map(|(guild_id, _)| *guild_id)
            .ok_or_else(|| BotError::ChannelNotFound {
                id: channel_id.to_string(),
            })
    }

    /// Channels linked to a guild, in link order
    pub fn linked_channels(&self, guild_id: GuildId) -> Vec<Channel> {
        let Some(ids) = self.links.as_ref().and_then(|links| links.get(&guild_id)) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.channels.iter().find(|c| c.id == *id))
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> Connections {
        let by_id: HashMap<ChannelId, &Channel> =
            self.channels.iter().map(|c| (c.id, c)).collect();
        let links = self
            .links
            .iter()
            .flatten()
            .map(|(guild_id, ids)| {
                let channels = ids
                    .iter()
                    .filter_map(|id| by_id.get(id).map(|c| (*c).clone()))
                    .collect();
                (*guild_id, channels)
            })
            .collect();

        Connections {
            links,
            guilds: self.guilds.clone().unwrap_or_default(),
            channels: self.channels.clone(),
        }
    }

    pub fn private_channels(&self) -> Vec<Channel> {
        self.private.clone()
    }

    pub fn main_guild(&self) -> Option<GuildId> {
        self.main_guild
    }

    pub fn main_channel(&self) -> Option<ChannelId> {
        self.main_channel
    }

    /// Select the first known guild and its main channel
    pub fn reset_main(&mut self) -> Result<GuildId> {
        let guild_id = self
            .guilds
            .as_ref()
            .ok_or(BotError::GuildsNotLoaded)?
            .first()
            .map(|g| g.id)
            .ok_or(BotError::NoGuilds)?;

        self.main_guild = Some(guild_id);
        self.main_channel = self.default_channel(guild_id);
        Ok(guild_id)
    }

    /// The legacy default channel shares the guild's id; otherwise fall back
    /// to the first text channel in link order.
    fn default_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let channels = self.linked_channels(guild_id);
        channels
            .iter()
            .find(|c| c.id.get() == guild_id.get())
            .or_else(|| channels.iter().find(|c| c.is_text()))
            .map(|c| c.id)
    }

    /// Select `channel_id` as main channel. The main guild follows it to
    /// `guild_id`, so both selections always point at the same guild.
    pub fn set_main_channel(&mut self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        let linked = self
            .links
            .as_ref()
            .and_then(|links| links.get(&guild_id))
            .is_some_and(|ids| ids.contains(&channel_id));
        if !linked {
            return Err(BotError::ChannelNotFound {
                id: channel_id.to_string(),
            });
        }
        self.main_guild = Some(guild_id);
        self.main_channel = Some(channel_id);
        Ok(())
    }
}

fn link(entry: &mut Vec<ChannelId>, channel_id: ChannelId) {
    if !entry.contains(&channel_id) {
        entry.push(channel_id);
    }
}

/// Shared entity cache type
pub type SharedEntityCache = Arc<RwLock<EntityCache>>;

pub fn create_shared_entity_cache() -> SharedEntityCache {
    Arc::new(RwLock::new(EntityCache::new()))
}

#[cfg(test)]
pub(crate) fn assert_links_consistent(cache: &EntityCache) {
    let Some(links) = &cache.links else {
        return;
    };
    for channel in &cache.channels {
        if let Some(guild_id) = channel.guild_id {
            let entry = links
                .get(&guild_id)
                .unwrap_or_else(|| panic!("guild {} has no link entry", guild_id));
            let count = entry.iter().filter(|id| **id == channel.id).count();
            assert_eq!(count, 1, "channel {} linked {} times", channel.id, count);
        }
    }
    for (guild_id, ids) in links {
        for id in ids {
            let channel = cache
                .channels
                .iter()
                .find(|c| c.id == *id)
                .unwrap_or_else(|| panic!("linked channel {} missing from flat set", id));
            assert_eq!(channel.guild_id, Some(*guild_id));
        }
    }
}
