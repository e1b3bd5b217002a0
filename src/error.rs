use serenity::model::id::{ChannelId, MessageId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // Cache preconditions
    #[error("Guilds have not been loaded yet")]
    GuildsNotLoaded,

    #[error("Guild/channel links have not been loaded yet")]
    LinksNotLoaded,

    #[error("Bot is not a member of any guild")]
    NoGuilds,

    // Lookups
    #[error("Channel not found: {id}")]
    ChannelNotFound { id: String },

    #[error("Guild not found: {id}")]
    GuildNotFound { id: String },

    #[error("Role not found: {id}")]
    RoleNotFound { id: String },

    #[error("Member not found: {name}")]
    MemberNotFound { name: String },

    // Channel lock errors
    #[error("Bad channel {id}: cannot lock a {kind} channel")]
    BadChannel { id: String, kind: String },

    #[error("Channel {id} is not locked")]
    NotLocked { id: String },

    #[error("Channel {channel} unlocked, but notice {message} could not be deleted: {source}")]
    NoticeCleanup {
        channel: ChannelId,
        message: MessageId,
        #[source]
        source: Box<BotError>,
    },

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord { message: String },
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
