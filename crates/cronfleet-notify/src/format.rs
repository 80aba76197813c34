//! Human-readable rendering of a payload.

use chrono::{DateTime, SecondsFormat, Utc};
use cronfleet_protocols::NotificationPayload;

/// Longest log tail rendered per container, in characters.
const MAX_LOG_CHARS: usize = 3000;

/// Multi-line text summary: a header line, stop details, then one block per
/// container with its failure reason and the tail of its log.
pub fn summary(payload: &NotificationPayload) -> String {
    let mut text = format!(
        "[{}] execution {} {}",
        payload.job_id, payload.execution_id, payload.status
    );
    if let Some(code) = &payload.stop_code {
        text.push_str(&format!(" ({})", code));
    }
    text.push('\n');

    if let Some(reason) = &payload.stopped_reason {
        text.push_str(&format!("Reason: {}\n", reason));
    }
    if let Some(at) = payload.stopped_at {
        text.push_str(&format!("Stopped at: {}\n", timestamp(at)));
    }

    for (name, container) in &payload.containers {
        match &container.short_message {
            Some(message) => text.push_str(&format!("--- {}: {}\n", name, message)),
            None => text.push_str(&format!("--- {}\n", name)),
        }
        let log = tail(&container.log, MAX_LOG_CHARS);
        if !log.is_empty() {
            text.push_str(log);
            if !log.ends_with('\n') {
                text.push('\n');
            }
        }
    }

    text
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Last `max` characters of `s`, split on a char boundary.
fn tail(s: &str, max: usize) -> &str {
    if max == 0 {
        return "";
    }
    match s.char_indices().rev().nth(max - 1) {
        Some((start, _)) => &s[start..],
        None => s,
    }
}
