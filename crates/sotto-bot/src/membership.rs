//! Mandatory channel gate.

use tracing::debug;

use crate::Bot;

/// True only if the user is subscribed to every mandatory channel.
///
/// Fail-closed: any lookup failure (channel gone, API error) denies. The
/// result is never cached — subscription can change between calls, so every
/// gated action re-checks.
pub async fn is_member(bot: &Bot, user_id: i64) -> bool {
    for channel in &bot.config.channels {
        match bot
            .api
            .get_chat_member(&format!("@{channel}"), user_id)
            .await
        {
            Ok(member) if member.is_subscribed() => {}
            Ok(member) => {
                debug!(user_id, channel, status = %member.status, "membership check failed");
                return false;
            }
            Err(e) => {
                debug!(user_id, channel, error = %e, "membership lookup failed, denying");
                return false;
            }
        }
    }
    true
}
