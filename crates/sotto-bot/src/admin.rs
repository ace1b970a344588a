//! Administrator control surface: broadcast, group listing, watcher
//! management, and direct send. All of it lives in the administrator's
//! private channel as a small fixed vocabulary of free-text commands.

use std::time::Duration;

use tracing::{debug, warn};

use sotto_telegram::api::SendOptions;
use sotto_telegram::types::Message;
use sotto_types::display::{group_title, mention_html};

use crate::private::reply;
use crate::Bot;

/// Pause between broadcast forwards, to stay under flood limits.
const BROADCAST_PAUSE: Duration = Duration::from_millis(50);

/// Try to interpret a private message from the administrator as a command.
/// Returns false when the message is none of them (it then falls through to
/// the normal whisper submission path).
pub async fn handle(bot: &Bot, msg: &Message, text: &str) -> bool {
    let admin_id = bot.config.admin_id;

    let mode = match text {
        "broadcast all" => Some("all"),
        "broadcast users" => Some("users"),
        "broadcast groups" => Some("groups"),
        _ => None,
    };
    if let Some(mode) = mode {
        match bot.db.set_admin_session(admin_id, mode) {
            Ok(()) => {
                reply(
                    bot,
                    admin_id,
                    "Send the banner now; it will be forwarded to the selected audience.",
                )
                .await;
            }
            Err(e) => {
                warn!(error = %e, "admin session store failed");
                reply(bot, admin_id, "Could not arm the broadcast. Try again.").await;
            }
        }
        return true;
    }

    // An armed session claims the next administrator message as the banner.
    match bot.db.take_admin_session(admin_id) {
        Ok(Some(mode)) => {
            broadcast(bot, msg, &mode).await;
            return true;
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "admin session lookup failed"),
    }

    if text == "groups" {
        list_groups(bot).await;
        return true;
    }

    if let Some(rest) = text.strip_prefix("watch ") {
        match parse_pair(rest) {
            Some((_, watcher_id)) if watcher_id == admin_id => {
                reply(bot, admin_id, "The administrator always receives reports.").await;
            }
            Some((group_id, watcher_id)) => match bot.db.add_watcher(group_id, watcher_id) {
                Ok(true) => reply(bot, admin_id, "Watcher registered.").await,
                Ok(false) => reply(bot, admin_id, "Already a watcher of that group.").await,
                Err(e) => {
                    warn!(error = %e, "watcher insert failed");
                    reply(bot, admin_id, "Could not register the watcher.").await;
                }
            },
            None => reply(bot, admin_id, "Usage: watch <group_id> <user_id>").await,
        }
        return true;
    }

    if let Some(rest) = text.strip_prefix("unwatch ") {
        match parse_pair(rest) {
            Some((group_id, watcher_id)) => match bot.db.remove_watcher(group_id, watcher_id) {
                Ok(true) => reply(bot, admin_id, "Watcher removed.").await,
                Ok(false) => reply(bot, admin_id, "No such watcher.").await,
                Err(e) => {
                    warn!(error = %e, "watcher removal failed");
                    reply(bot, admin_id, "Could not remove the watcher.").await;
                }
            },
            None => reply(bot, admin_id, "Usage: unwatch <group_id> <user_id>").await,
        }
        return true;
    }

    if let Some(rest) = text.strip_prefix("watchers ") {
        match rest.trim().parse::<i64>() {
            Ok(group_id) => {
                let listing = match bot.db.watchers_for(group_id) {
                    Ok(ids) if ids.is_empty() => "No watchers for that group.".to_string(),
                    Ok(ids) => format!(
                        "Watchers: {}",
                        ids.iter()
                            .map(|id| id.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    Err(e) => {
                        warn!(error = %e, "watcher listing failed");
                        "Could not list watchers.".to_string()
                    }
                };
                reply(bot, admin_id, &listing).await;
            }
            Err(_) => reply(bot, admin_id, "Usage: watchers <group_id>").await,
        }
        return true;
    }

    if let Some(rest) = text.strip_prefix("send ") {
        let mut parts = rest.splitn(2, ' ');
        let chat_id = parts.next().and_then(|p| p.parse::<i64>().ok());
        let body = parts.next().map(str::trim).filter(|b| !b.is_empty());
        match (chat_id, body) {
            (Some(chat_id), Some(body)) => {
                match bot.api.send_message(chat_id, body, SendOptions::default()).await {
                    Ok(_) => reply(bot, admin_id, "Delivered.").await,
                    Err(e) => {
                        debug!(chat_id, error = %e, "direct send failed");
                        reply(bot, admin_id, "Delivery failed.").await;
                    }
                }
            }
            _ => reply(bot, admin_id, "Usage: send <chat_id> <text>").await,
        }
        return true;
    }

    false
}

/// Forward the banner to the selected audience. Per-target failures are
/// skipped; the count of successful deliveries is reported back.
async fn broadcast(bot: &Bot, banner: &Message, mode: &str) {
    let admin_id = bot.config.admin_id;

    let targets = match collect_targets(bot, mode) {
        Ok(targets) => targets,
        Err(e) => {
            warn!(error = %e, "broadcast target lookup failed");
            reply(bot, admin_id, "Could not load the broadcast audience.").await;
            return;
        }
    };

    reply(bot, admin_id, "Forwarding…").await;

    let mut delivered = 0usize;
    for target in &targets {
        match bot
            .api
            .forward_message(*target, banner.chat.id, banner.message_id)
            .await
        {
            Ok(_) => delivered += 1,
            Err(e) => debug!(target, error = %e, "broadcast target skipped"),
        }
        tokio::time::sleep(BROADCAST_PAUSE).await;
    }

    reply(
        bot,
        admin_id,
        &format!("Broadcast finished ({delivered} of {} delivered).", targets.len()),
    )
    .await;
}

fn collect_targets(bot: &Bot, mode: &str) -> anyhow::Result<Vec<i64>> {
    Ok(match mode {
        "users" => bot.db.all_user_ids()?,
        "groups" => bot.db.all_group_ids()?,
        _ => {
            let mut targets = bot.db.all_user_ids()?;
            targets.extend(bot.db.all_group_ids()?);
            targets
        }
    })
}

/// Group listing with best-effort creator lookup.
async fn list_groups(bot: &Bot) {
    let admin_id = bot.config.admin_id;

    let groups = match bot.db.list_groups() {
        Ok(groups) => groups,
        Err(e) => {
            warn!(error = %e, "group listing failed");
            reply(bot, admin_id, "Could not list groups.").await;
            return;
        }
    };

    let mut lines = Vec::new();
    for group in &groups {
        let owner = match bot.api.get_chat_administrators(group.chat_id).await {
            Ok(admins) => admins
                .into_iter()
                .find(|a| a.status == "creator")
                .map(|creator| {
                    format!(
                        "{} (@{})",
                        mention_html(creator.user.id, &creator.user.first_name),
                        creator.user.username.as_deref().unwrap_or("—"),
                    )
                }),
            Err(e) => {
                debug!(group_id = group.chat_id, error = %e, "creator lookup failed");
                None
            }
        }
        .unwrap_or_else(|| "unknown".to_string());

        lines.push(format!(
            "• {} — ID: <code>{}</code>\n  owner: {}",
            group_title(group.title.as_deref()),
            group.chat_id,
            owner,
        ));
    }

    let listing = if lines.is_empty() {
        "Known groups:\n\nnone found.".to_string()
    } else {
        format!("Known groups:\n\n{}", lines.join("\n"))
    };

    if let Err(e) = bot
        .api
        .send_message(
            admin_id,
            &listing,
            SendOptions {
                disable_web_page_preview: true,
                ..SendOptions::html()
            },
        )
        .await
    {
        debug!(error = %e, "group listing send failed");
    }
}

fn parse_pair(rest: &str) -> Option<(i64, i64)> {
    let mut parts = rest.split_whitespace();
    let first = parts.next()?.parse().ok()?;
    let second = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((first, second))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_parsing() {
        assert_eq!(parse_pair("-100 42"), Some((-100, 42)));
        assert_eq!(parse_pair("  -100   42  "), Some((-100, 42)));
        assert_eq!(parse_pair("-100"), None);
        assert_eq!(parse_pair("-100 42 7"), None);
        assert_eq!(parse_pair("x y"), None);
    }
}
