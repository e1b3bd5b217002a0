use guildmirror::{messages, BotError};
use tracing::warn;

use crate::{Context, Error};

/// Stop members from sending messages in this channel
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_CHANNELS")]
pub async fn lock(
    ctx: Context<'_>,
    #[description = "Post a notice in the channel (default: yes)"] alert: Option<bool>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let channel_id = ctx.channel_id();
    let alert = alert.unwrap_or(true);

    // Reuse a lock whose previous attempt failed so its captured overwrites survive
    let mut channel_lock = match ctx.data().locks.remove(&channel_id) {
        Some((_, existing)) if existing.is_locked() => {
            ctx.data().locks.insert(channel_id, existing);
            ctx.say("This channel is already locked.").await?;
            return Ok(());
        }
        Some((_, existing)) => existing,
        None => ctx.data().bot.channel_lock(channel_id).await?,
    };

    let outcome = channel_lock.lock(alert).await;
    let channel_name = channel_lock.channel().name.clone();
    ctx.data().locks.insert(channel_id, channel_lock);

    match outcome {
        Ok(()) => {
            ctx.say(messages::locked_reply(&channel_name, alert)).await?;
        }
        Err(e) => {
            warn!("Lock of #{} failed: {}", channel_name, e);
            ctx.say(format!(
                "Locking failed part way: {}\nRun `/lock` again to finish.",
                e
            ))
            .await?;
        }
    }
    Ok(())
}

/// Restore the permissions this channel had before `/lock`
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_CHANNELS")]
pub async fn unlock(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let channel_id = ctx.channel_id();
    let Some((_, mut channel_lock)) = ctx.data().locks.remove(&channel_id) else {
        ctx.say("This channel is not locked.").await?;
        return Ok(());
    };

    match channel_lock.unlock().await {
        Ok(()) => {
            ctx.say(messages::unlocked_reply(&channel_lock.channel().name))
                .await?;
        }
        Err(BotError::NoticeCleanup { source, .. }) => {
            ctx.say(format!(
                "{}\nThe lock notice could not be removed: {}",
                messages::unlocked_reply(&channel_lock.channel().name),
                source
            ))
            .await?;
        }
        Err(e) => {
            // Keep it around; the captured overwrites are needed for a retry
            ctx.data().locks.insert(channel_id, channel_lock);
            ctx.say(format!("Unlocking failed: {}", e)).await?;
        }
    }
    Ok(())
}
