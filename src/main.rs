use anyhow::Result;
use clap::Parser;
use dashmap::DashMap;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use guildmirror::config::BotConfig;
use guildmirror::model::{Channel, Guild};
use guildmirror::{Bot, ChannelLock, SerenityGateway, SharedBot, TopologyEvent};

/// Discord bot that mirrors guild/channel topology and locks channels on demand
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Activity shown as "Playing ..."
    #[arg(long)]
    activity: Option<String>,

    /// Seconds between full cache refreshes (0 disables)
    #[arg(long)]
    refresh_interval: Option<u64>,

    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Specific guild ID to register commands to (for testing)
    #[arg(long)]
    guild_id: Option<u64>,
}

mod commands;

use commands::{lock, refresh, unlock};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub bot: SharedBot,
    /// Channel locks created by `/lock`, keyed by channel
    pub locks: DashMap<serenity::ChannelId, ChannelLock>,
}

/// Outcome of the ready handler, delivered once
type ReadySignal = std::result::Result<SharedBot, String>;

async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::ChannelCreate { channel } => {
            data.bot.on_channel_created(Channel::from(channel));
        }
        serenity::FullEvent::ChannelUpdate { new, .. } => {
            data.bot.on_channel_updated(Channel::from(new));
        }
        serenity::FullEvent::ChannelDelete { channel, .. } => {
            data.bot.on_channel_deleted(Channel::from(channel));
            if data.locks.remove(&channel.id).is_some() {
                warn!("Dropped lock for deleted channel {}", channel.id);
            }
        }
        serenity::FullEvent::GuildCreate { guild, .. } => {
            data.bot
                .on_topology_event(TopologyEvent::GuildAvailable(Guild::from(guild)));
        }
        _ => {}
    }
    Ok(())
}

fn load_config(args: &Args) -> guildmirror::Result<BotConfig> {
    let mut config = match &args.config {
        Some(path) => BotConfig::load_from_file(path)?,
        None => BotConfig::default(),
    };

    if let Some(activity) = &args.activity {
        config.activity = Some(activity.clone());
    }
    if let Some(secs) = args.refresh_interval {
        config.refresh_interval_secs = secs;
    }
    if args.guild_commands {
        config.guild_commands = true;
    }

    config.validate()?;
    Ok(config)
}

async fn periodic_refresh(bot: SharedBot, interval: Duration) {
    info!("Refreshing connections every {:?}", interval);
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately and startup just refreshed
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if let Err(e) = bot.refresh_all().await {
            warn!("Periodic refresh failed: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    let config = load_config(&args)?;
    let token = std::env::var("DISCORD_TOKEN")
        .map_err(|_| anyhow::anyhow!("Missing DISCORD_TOKEN environment variable"))?;

    let target_guild_id = args.guild_id;
    if config.guild_commands {
        info!("Registering commands per-guild (faster for testing)");
    } else {
        info!("Registering commands globally (takes up to 1 hour to propagate)");
    }

    let (ready_tx, ready_rx) = oneshot::channel::<ReadySignal>();
    let refresh_interval = config.refresh_interval();
    let setup_config = config.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![lock(), unlock(), refresh()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.channel_id()
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx.say(format!("An error occurred: {}", error)).await;
                        }
                        poise::FrameworkError::MissingUserPermissions { missing_permissions, ctx, .. } => {
                            warn!("User {} missing permissions for '{}': {:?}", ctx.author().name, ctx.command().qualified_name, missing_permissions);
                            let _ = ctx.say("You are not allowed to run this command.").await;
                        }
                        poise::FrameworkError::Setup { error, .. } => {
                            error!("Startup failed: {}", error);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let gateway = Arc::new(SerenityGateway::new(ctx.http.clone()));
                let bot: SharedBot = Arc::new(Bot::new(gateway));

                if let Err(e) = bot.reset_connections().await {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return Err(e.into());
                }

                if let Some(channel) = setup_config.main_channel {
                    let channel_id = serenity::ChannelId::new(channel);
                    let selected = bot
                        .find_guild_id_for_channel(channel_id)
                        .and_then(|guild_id| bot.set_main_channel(guild_id, channel_id));
                    if let Err(e) = selected {
                        warn!("Configured main channel {} not usable: {}", channel, e);
                    }
                }

                if let Some(activity) = &setup_config.activity {
                    ctx.set_activity(Some(serenity::ActivityData::playing(activity)));
                }

                let guilds_to_register: Vec<serenity::GuildId> = match target_guild_id {
                    Some(gid) => vec![serenity::GuildId::new(gid)],
                    None => ready.guilds.iter().map(|g| g.id).collect(),
                };

                if setup_config.guild_commands {
                    for guild_id in &guilds_to_register {
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            *guild_id,
                        )
                        .await
                        {
                            error!("Failed to register commands for guild {}: {}", guild_id, e);
                        }
                    }
                } else if let Err(e) =
                    poise::builtins::register_globally(ctx, &framework.options().commands).await
                {
                    error!("Failed to register commands globally: {}", e);
                }

                let _ = ready_tx.send(Ok(bot.clone()));

                Ok(Data {
                    bot,
                    locks: DashMap::new(),
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match ready_rx.await {
            Ok(Ok(bot)) => {
                info!(
                    "Bot core ready: main guild {:?}, main channel {:?}",
                    bot.main_guild(),
                    bot.main_channel()
                );
                if let Some(interval) = refresh_interval {
                    periodic_refresh(bot, interval).await;
                }
            }
            Ok(Err(message)) => {
                error!("Bot failed to become ready: {}", message);
                shard_manager.shutdown_all().await;
            }
            Err(_) => {
                warn!("Ready handler ended without reporting");
            }
        }
    });

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("Enable the GUILD_MEMBERS privileged intent in the Discord Developer Portal");
            return Err(anyhow::anyhow!(
                "Disallowed gateway intents: enable GUILD_MEMBERS in the Discord Developer Portal"
            ));
        }
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}
