// src/messages.rs
use chrono::{DateTime, Utc};

use crate::model::Role;

pub fn lock_notice(channel_name: &str, roles: &[Role], at: DateTime<Utc>) -> String {
    let affected = if roles.is_empty() {
        "no roles".to_string()
    } else {
        roles
            .iter()
            .map(|r| format!("**{}**", r.name))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "🔒 **Channel Locked**\n\n\
        **#{}** was locked at {} UTC.\n\
        Sending messages is disabled for: {}\n\n\
        This notice disappears when the channel is unlocked.",
        channel_name,
        at.format("%Y-%m-%d %H:%M"),
        affected
    )
}

pub fn locked_reply(channel_name: &str, alert: bool) -> String {
    if alert {
        format!("🔒 Locked **#{}** and posted a notice.", channel_name)
    } else {
        format!("🔒 Locked **#{}**.", channel_name)
    }
}

pub fn unlocked_reply(channel_name: &str) -> String {
    format!("🔓 Unlocked **#{}**.", channel_name)
}
