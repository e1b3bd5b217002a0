use serenity::model::id::GuildId;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::error::{BotError, Result};
use crate::gateway::SharedGateway;
use crate::model::Guild;
use crate::state::SharedEntityCache;

/// Page size used when listing the bot's guilds
pub const GUILD_PAGE_SIZE: u64 = 100;

/// One refreshable part of the cache.
///
/// The declaration order is the processing order: channels and links are
/// resolved by iterating the known guilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Guilds,
    Channels,
    Links,
    PrivateChannels,
}

impl Dimension {
    fn needs_guilds(self) -> bool {
        matches!(self, Dimension::Channels | Dimension::Links)
    }
}

/// Set of dimensions to refresh, iterated in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dimensions(BTreeSet<Dimension>);

impl Dimensions {
    pub fn all() -> Self {
        [
            Dimension::Guilds,
            Dimension::Channels,
            Dimension::Links,
            Dimension::PrivateChannels,
        ]
        .into_iter()
        .collect()
    }

    pub fn with(mut self, dimension: Dimension) -> Self {
        self.0.insert(dimension);
        self
    }

    pub fn contains(&self, dimension: Dimension) -> bool {
        self.0.contains(&dimension)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Dimension> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Dimension> for Dimensions {
    fn from_iter<I: IntoIterator<Item = Dimension>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Dimension> for Dimensions {
    fn from(dimension: Dimension) -> Self {
        Self::default().with(dimension)
    }
}

impl<const N: usize> From<[Dimension; N]> for Dimensions {
    fn from(dimensions: [Dimension; N]) -> Self {
        dimensions.into_iter().collect()
    }
}

/// Refreshes the entity cache from the gateway.
///
/// Refreshes are serialized behind `gate`, which is held across network
/// calls. The cache lock is only taken for the merge after each fetch.
pub struct SyncEngine {
    gateway: SharedGateway,
    cache: SharedEntityCache,
    gate: tokio::sync::Mutex<()>,
}

impl SyncEngine {
    pub fn new(gateway: SharedGateway, cache: SharedEntityCache) -> Self {
        Self {
            gateway,
            cache,
            gate: tokio::sync::Mutex::new(()),
        }
    }

    pub async fn refresh_all(&self) -> Result<()> {
        self.refresh(Dimensions::all()).await
    }

    /// Refresh the requested dimensions, guilds first.
    ///
    /// A failing dimension aborts the rest; dimensions already refreshed in
    /// this call keep their results.
    pub async fn refresh(&self, dimensions: impl Into<Dimensions>) -> Result<()> {
        let dimensions = dimensions.into();
        if dimensions.is_empty() {
            debug!("Nothing to refresh");
            return Ok(());
        }
        let _gate = self.gate.lock().await;

        let needs_guilds = dimensions.iter().any(Dimension::needs_guilds);
        if needs_guilds && !dimensions.contains(Dimension::Guilds) && !self.guilds_loaded() {
            return Err(BotError::GuildsNotLoaded);
        }

        for dimension in dimensions.iter() {
            let outcome = match dimension {
                Dimension::Guilds => self.refresh_guilds().await,
                Dimension::Channels => self.refresh_channels().await,
                Dimension::Links => self.refresh_links().await,
                Dimension::PrivateChannels => self.refresh_private().await,
            };
            if let Err(e) = outcome {
                warn!("Refresh of {:?} failed, aborting remaining dimensions: {}", dimension, e);
                return Err(e);
            }
        }

        debug!("Refreshed {:?}", dimensions);
        Ok(())
    }

    fn guilds_loaded(&self) -> bool {
        self.cache.read().guilds_loaded()
    }

    fn is_known_guild(&self, guild_id: GuildId) -> bool {
        self.cache.read().is_known_guild(guild_id)
    }

    async fn refresh_guilds(&self) -> Result<()> {
        let mut after = None;
        let mut added = 0;

        loop {
            let page = self.gateway.list_guilds(GUILD_PAGE_SIZE, after).await?;
            let full_page = page.len() as u64 == GUILD_PAGE_SIZE;
            let cursor = page.last().map(|g| g.id);

            let mut fetched: Vec<Guild> = Vec::with_capacity(page.len());
            for listed in page {
                if self.is_known_guild(listed.id) {
                    continue;
                }
                fetched.push(self.gateway.get_guild(listed.id).await?);
            }
            added += self.cache.write().merge_guilds(fetched);

            match cursor {
                Some(id) if full_page => after = Some(id),
                _ => break,
            }
        }

        info!("Guild refresh complete: {} new guilds", added);
        Ok(())
    }

    async fn refresh_channels(&self) -> Result<()> {
        let guild_ids = self.cache.read().guild_ids()?;
        let mut added = 0;

        for guild_id in guild_ids {
            let channels = self.gateway.list_guild_channels(guild_id).await?;
            added += self.cache.write().merge_channels(channels);
        }

        info!("Channel refresh complete: {} new channels", added);
        Ok(())
    }

    async fn refresh_links(&self) -> Result<()> {
        let unresolved = self.cache.read().unresolved_link_guilds()?;

        for guild_id in &unresolved {
            let channels = self.gateway.list_guild_channels(*guild_id).await?;
            self.cache.write().insert_links(*guild_id, channels);
        }
        self.cache.write().ensure_links();

        info!("Link refresh complete: {} guilds resolved", unresolved.len());
        Ok(())
    }

    async fn refresh_private(&self) -> Result<()> {
        let channels = self.gateway.list_private_channels().await?;
        let added = self.cache.write().merge_private(channels);

        info!("Private channel refresh complete: {} new channels", added);
        Ok(())
    }
}
