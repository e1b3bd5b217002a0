use tracing::info;

use crate::{Context, Error};

/// Re-sync guilds, channels and links from Discord
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn refresh(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let bot = &ctx.data().bot;
    bot.refresh_all().await?;

    let connections = bot.snapshot();
    info!(
        "Manual refresh by {}: {} guilds, {} channels",
        ctx.author().name,
        connections.guilds.len(),
        connections.channels.len()
    );
    ctx.say(format!(
        "Refreshed: {} guilds, {} channels, {} linked guilds.",
        connections.guilds.len(),
        connections.channels.len(),
        connections.links.len()
    ))
    .await?;
    Ok(())
}
