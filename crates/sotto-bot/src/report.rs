//! Audit report fan-out.

use tracing::{debug, warn};

use sotto_telegram::api::SendOptions;
use sotto_types::display::{mention_html, snippet};
use sotto_types::ALERT_SNIPPET;

use crate::Bot;

/// A finalized whisper, ready to be reported.
pub struct WhisperReport {
    pub group_id: i64,
    pub group_title: Option<String>,
    pub sender_id: i64,
    pub sender_name: String,
    pub receiver_id: i64,
    pub receiver_name: String,
    pub body: String,
}

/// Deliver the audit copy to the administrator and the group's watchers.
///
/// The administrator is deduplicated out of the watcher set. A recipient
/// that cannot be reached (blocked the bot, never started it) is skipped;
/// the fan-out itself never fails the operation that triggered it.
pub async fn fan_out(bot: &Bot, report: &WhisperReport) {
    let text = render(report);
    let opts = || SendOptions {
        disable_web_page_preview: true,
        ..SendOptions::html()
    };

    if let Err(e) = bot
        .api
        .send_message(bot.config.admin_id, &text, opts())
        .await
    {
        warn!(error = %e, "audit report to administrator failed");
    }

    let watchers = match bot.db.watchers_for(report.group_id) {
        Ok(watchers) => watchers,
        Err(e) => {
            warn!(error = %e, group_id = report.group_id, "watcher lookup failed");
            return;
        }
    };

    for watcher in watchers {
        if watcher == bot.config.admin_id {
            continue;
        }
        if let Err(e) = bot.api.send_message(watcher, &text, opts()).await {
            debug!(watcher, error = %e, "audit report to watcher skipped");
        }
    }
}

fn render(report: &WhisperReport) -> String {
    let group = match &report.group_title {
        Some(title) => format!(
            "{} (ID: <code>{}</code>)",
            sotto_types::display::group_title(Some(title)),
            report.group_id
        ),
        // inline-path whispers have no originating group
        None if report.group_id == 0 => "direct".to_string(),
        None => format!("(ID: <code>{}</code>)", report.group_id),
    };

    format!(
        "📥 Whisper report\nGroup: {group}\nFrom: {} → To: {}\n\n{}",
        mention_html(report.sender_id, &report.sender_name),
        mention_html(report.receiver_id, &report.receiver_name),
        snippet(&report.body, ALERT_SNIPPET),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_renders_group_and_mentions() {
        let text = render(&WhisperReport {
            group_id: -100,
            group_title: Some("Chess Club".into()),
            sender_id: 1,
            sender_name: "Alice".into(),
            receiver_id: 2,
            receiver_name: "Bob".into(),
            body: "meet me at 5".into(),
        });
        assert!(text.contains("Chess Club"));
        assert!(text.contains("tg://user?id=1"));
        assert!(text.contains("tg://user?id=2"));
        assert!(text.contains("meet me at 5"));
    }

    #[test]
    fn inline_report_renders_direct() {
        let text = render(&WhisperReport {
            group_id: 0,
            group_title: None,
            sender_id: 1,
            sender_name: "Alice".into(),
            receiver_id: 2,
            receiver_name: "Carol".into(),
            body: "hello".into(),
        });
        assert!(text.contains("Group: direct"));
    }

    #[test]
    fn long_bodies_are_snipped() {
        let text = render(&WhisperReport {
            group_id: -100,
            group_title: None,
            sender_id: 1,
            sender_name: "A".into(),
            receiver_id: 2,
            receiver_name: "B".into(),
            body: "x".repeat(400),
        });
        assert!(text.ends_with('…'));
    }
}
