//! Plain-text rendering of the trust status consumed by the hosting conversation.

use crate::plugins::trust::StatusReport;

pub const HEADER: &str = "[Governor:Trust]";

/// The confirm/deny hint appended to a pending promotion.
pub fn command_hint(prefix: &str) -> String {
    let prefix = prefix.trim().trim_start_matches('/');
    if prefix.is_empty() {
        "/promote|/deny".to_string()
    } else {
        format!("/{} promote|deny", prefix)
    }
}

pub fn status_lines(report: &StatusReport, command_prefix: &str) -> Vec<String> {
    let checkpoints = report
        .checkpoints
        .iter()
        .map(|cp| cp.label())
        .collect::<Vec<_>>()
        .join(", ");
    let mut lines = vec![
        HEADER.to_string(),
        format!("Level: {} ({})", report.level, report.trust),
        format!("Checkpoints: {}", checkpoints),
    ];
    if let Some(pending) = report.pending_promotion {
        lines.push(format!("Pending: {} ({})", pending, command_hint(command_prefix)));
    }
    lines
}

/// Optional one-line outcome, then the status block.
pub fn render(headline: Option<&str>, report: &StatusReport, command_prefix: &str) -> String {
    let mut lines = Vec::new();
    if let Some(headline) = headline {
        lines.push(format!("{} {}", HEADER, headline));
    }
    lines.extend(status_lines(report, command_prefix));
    lines.join("\n")
}
