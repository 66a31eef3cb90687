//! Content formatting rules for the relay
//!
//! Truncation to platform limits, the strike markup used for delete
//! audit-trails (idempotent: existing markers are stripped before
//! re-applying), attachment annotation, and the staff-note sentinel.

use modmail_core::OutboundEmbed;

/// Platform content limit for DM sends
pub const DM_CONTENT_LIMIT: usize = 2000;

/// Platform content limit inside an embed description
pub const EMBED_CONTENT_LIMIT: usize = 1024;

/// Appended when content had to be cut
const TRUNCATION_MARKER: &str = "… (truncated)";

/// Strike markup wrapped around deleted mirrors
const STRIKE: &str = "~~";

/// Suffix on deleted mirrors
const DELETED_SUFFIX: &str = " (deleted)";

/// Leading sentinel marking a silent staff note
const STAFF_NOTE_SENTINEL: char = '.';

/// Footer reminding staff-attributed replies how the user can close
const CLOSURE_HINT: &str = "Reply here to answer. The team can close this conversation when it is resolved.";

/// Whether a raw staff message is a silent note that must never relay
pub fn is_staff_note(content: &str) -> bool {
    content.starts_with(STAFF_NOTE_SENTINEL)
}

/// Cut content to `limit` characters, appending the truncation marker.
///
/// Counts characters rather than bytes so multi-byte content never splits
/// mid-codepoint.
pub fn truncate(content: &str, limit: usize) -> String {
    if content.chars().count() <= limit {
        return content.to_string();
    }
    let marker_len = TRUNCATION_MARKER.chars().count();
    let keep = limit.saturating_sub(marker_len);
    let cut: String = content.chars().take(keep).collect();
    format!("{cut}{TRUNCATION_MARKER}")
}

/// Truncate for a DM send
pub fn truncate_for_dm(content: &str) -> String {
    truncate(content, DM_CONTENT_LIMIT)
}

/// Truncate for an embed description
pub fn truncate_for_embed(content: &str) -> String {
    truncate(content, EMBED_CONTENT_LIMIT)
}

/// Remove any existing strike markup and deleted suffix
pub fn strip_strike(content: &str) -> String {
    let mut inner = content.trim();
    if let Some(stripped) = inner.strip_suffix(DELETED_SUFFIX.trim_start()) {
        inner = stripped.trim_end();
    }
    if let (Some(without_open), true) = (inner.strip_prefix(STRIKE), inner.len() >= 2 * STRIKE.len())
    {
        if let Some(without_both) = without_open.strip_suffix(STRIKE) {
            inner = without_both;
        }
    }
    inner.to_string()
}

/// Wrap content in strike markup with the deleted suffix. Idempotent:
/// already-wrapped content comes out wrapped exactly once.
pub fn strike_deleted(content: &str) -> String {
    let inner = strip_strike(content);
    format!("{STRIKE}{inner}{STRIKE}{DELETED_SUFFIX}")
}

/// Append attachment references by URL, never re-uploading
pub fn annotate_attachments(content: &str, attachment_urls: &[String]) -> String {
    if attachment_urls.is_empty() {
        return content.to_string();
    }
    let mut out = String::from(content);
    for url in attachment_urls {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("[attachment] ");
        out.push_str(url);
    }
    out
}

/// Build the attributed embed block for a staff reply relayed to the user
pub fn staff_reply_embed(staff_name: &str, content: &str) -> OutboundEmbed {
    OutboundEmbed {
        author_name: Some(staff_name.to_string()),
        description: truncate_for_embed(content),
        footer: Some(CLOSURE_HINT.to_string()),
    }
}

/// Thread name carrying the conversation's status metadata
pub fn thread_name(user_display_name: &str, status: ThreadStatus) -> String {
    let name = truncate(user_display_name, 80);
    match status {
        ThreadStatus::Open => name,
        ThreadStatus::Claimed => format!("[claimed] {name}"),
        ThreadStatus::Resolved => format!("[resolved] {name}"),
        ThreadStatus::Closed => format!("[closed] {name}"),
    }
}

/// Conversation status reflected in the thread name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    Open,
    Claimed,
    Resolved,
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_content_untouched() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_appends_marker() {
        let long = "a".repeat(2100);
        let out = truncate_for_dm(&long);
        assert_eq!(out.chars().count(), DM_CONTENT_LIMIT);
        assert!(out.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "é".repeat(1100);
        let out = truncate_for_embed(&long);
        assert_eq!(out.chars().count(), EMBED_CONTENT_LIMIT);
    }

    #[test]
    fn test_strike_is_idempotent() {
        let once = strike_deleted("hello");
        let twice = strike_deleted(&once);
        assert_eq!(once, "~~hello~~ (deleted)");
        assert_eq!(twice, once);
    }

    #[test]
    fn test_strip_strike_handles_plain_content() {
        assert_eq!(strip_strike("hello"), "hello");
        assert_eq!(strip_strike("~~hello~~ (deleted)"), "hello");
    }

    #[test]
    fn test_staff_note_sentinel() {
        assert!(is_staff_note(".note for the team"));
        assert!(!is_staff_note("regular reply"));
    }

    #[test]
    fn test_annotate_attachments() {
        let out = annotate_attachments(
            "see this",
            &["https://cdn.example/a.png".to_string()],
        );
        assert_eq!(out, "see this\n[attachment] https://cdn.example/a.png");
    }

    #[test]
    fn test_annotate_attachments_with_empty_content() {
        let out = annotate_attachments("", &["https://cdn.example/a.png".to_string()]);
        assert_eq!(out, "[attachment] https://cdn.example/a.png");
    }

    #[test]
    fn test_thread_name_status_prefixes() {
        assert_eq!(thread_name("alice", ThreadStatus::Open), "alice");
        assert_eq!(thread_name("alice", ThreadStatus::Claimed), "[claimed] alice");
        assert_eq!(thread_name("alice", ThreadStatus::Closed), "[closed] alice");
    }
}
