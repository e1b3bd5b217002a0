//! # guildmirror
//!
//! Client-side mirror of the guild/channel topology visible to a Discord bot,
//! kept in sync with gateway events, plus temporary channel locks built on
//! top of the mirrored permission overwrites.
//!
//! - **Entity cache**: guilds, channels, private channels and the
//!   guild -> channel link table behind one short-lived lock
//! - **Sync engine**: serialized, dimension-selective refreshes from the gateway
//! - **Topology router**: applies channel create/update/delete events in place
//! - **Channel lock**: reversible "send messages" revocation per channel

pub mod bot;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod managers;
pub mod messages;
pub mod model;
pub mod state;

pub use bot::{Bot, SharedBot};
pub use error::{BotError, Result};
pub use events::TopologyEvent;
pub use gateway::{GatewayClient, SerenityGateway};
pub use managers::{ChannelLock, Dimension, Dimensions};
pub use state::Connections;
