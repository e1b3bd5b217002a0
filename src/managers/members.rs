use serenity::model::id::GuildId;
use tracing::debug;

use crate::error::{BotError, Result};
use crate::gateway::GatewayClient;
use crate::model::Member;

/// Page size used when walking a guild's member list
pub const MEMBER_PAGE_SIZE: u64 = 1000;

/// Find a guild member by username or nickname, case-insensitively.
///
/// Members are never cached, so this pages through the live member list.
pub async fn find_member(
    gateway: &dyn GatewayClient,
    guild_id: GuildId,
    name: &str,
) -> Result<Member> {
    let mut after = None;
    loop {
        let page = gateway
            .list_guild_members(guild_id, after, MEMBER_PAGE_SIZE)
            .await?;
        debug!("Scanning {} members of guild {} for '{}'", page.len(), guild_id, name);

        let full_page = page.len() as u64 == MEMBER_PAGE_SIZE;
        after = page.last().map(|m| m.user_id);
        if let Some(member) = page.into_iter().find(|m| m.matches_name(name)) {
            return Ok(member);
        }
        if !full_page {
            return Err(BotError::MemberNotFound {
                name: name.to_string(),
            });
        }
    }
}
