//! Relay tests: mirroring, attribution, edits and strike-through deletes

mod common;

use chrono::{Duration, Utc};

use common::TestHarness;
use modmail_core::{MessageKind, Snowflake};
use modmail_service::RelayService;

const GUILD: Snowflake = Snowflake::new(1);
const USER: Snowflake = Snowflake::new(77);
const STAFF: Snowflake = Snowflake::new(500);

#[tokio::test]
async fn test_user_message_relays_under_own_identity() {
    let harness = TestHarness::new().with_guild(GUILD);
    let conversation = harness.seed_conversation(GUILD, USER);
    let relay = RelayService::new(&harness.ctx);

    relay
        .relay_user_message(&conversation, Snowflake::new(9001), "hello staff", &[])
        .await
        .unwrap();

    let posts = harness.gateway.webhook_posts.lock().unwrap().clone();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].thread_id, conversation.thread_id);
    assert_eq!(posts[0].username, conversation.user_display_name);
    assert_eq!(posts[0].content, "hello staff");

    let row = harness.conversations.get(USER).unwrap();
    assert_eq!(row.messages.len(), 1);
    assert_eq!(row.messages[0].kind, MessageKind::User);
    assert_eq!(row.messages[0].mirror_id, Some(posts[0].message_id));
}

#[tokio::test]
async fn test_user_message_resets_inactivity_state() {
    let harness = TestHarness::new().with_guild(GUILD);
    let conversation = harness.seed_conversation(GUILD, USER);
    harness.conversations.mutate(USER, |c| {
        c.last_user_activity_at = Utc::now() - Duration::hours(30);
        c.inactivity_notification_sent = Some(Utc::now() - Duration::hours(5));
        c.auto_close_scheduled_at = Some(Utc::now() + Duration::hours(163));
    });
    let relay = RelayService::new(&harness.ctx);

    relay
        .relay_user_message(&conversation, Snowflake::new(9001), "still here", &[])
        .await
        .unwrap();

    let row = harness.conversations.get(USER).unwrap();
    assert!(row.inactivity_notification_sent.is_none());
    assert!(row.auto_close_scheduled_at.is_none());
    assert!(row.hours_since_user_activity(Utc::now()) < 0.01);
}

#[tokio::test]
async fn test_staff_reply_reaches_user_as_attributed_embed() {
    let harness = TestHarness::new().with_guild(GUILD);
    let conversation = harness.seed_conversation(GUILD, USER);
    let relay = RelayService::new(&harness.ctx);

    relay
        .relay_staff_message(
            &conversation,
            Snowflake::new(9001),
            STAFF,
            "mod-bob",
            "we are looking into it",
            &[],
        )
        .await
        .unwrap();

    let dms = harness.gateway.dms.lock().unwrap().clone();
    assert_eq!(dms.len(), 1);
    let embed = dms[0].message.embed.as_ref().expect("embed block");
    assert_eq!(embed.author_name.as_deref(), Some("mod-bob"));
    assert!(embed.description.contains("we are looking into it"));

    let row = harness.conversations.get(USER).unwrap();
    assert_eq!(row.messages[0].kind, MessageKind::Staff);
    assert_eq!(row.messages[0].author_name, "mod-bob");
}

#[tokio::test]
async fn test_staff_note_is_acknowledged_not_relayed() {
    let harness = TestHarness::new().with_guild(GUILD);
    let conversation = harness.seed_conversation(GUILD, USER);
    let relay = RelayService::new(&harness.ctx);

    relay
        .relay_staff_message(
            &conversation,
            Snowflake::new(9001),
            STAFF,
            "mod-bob",
            ". internal note, user should not see this",
            &[],
        )
        .await
        .unwrap();

    assert!(harness.gateway.dms.lock().unwrap().is_empty());
    assert!(harness.conversations.get(USER).unwrap().messages.is_empty());

    let reactions = harness.gateway.reactions.lock().unwrap().clone();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].2, "✅");
}

#[tokio::test]
async fn test_attachments_are_annotated_inline() {
    let harness = TestHarness::new().with_guild(GUILD);
    let conversation = harness.seed_conversation(GUILD, USER);
    let relay = RelayService::new(&harness.ctx);

    relay
        .relay_user_message(
            &conversation,
            Snowflake::new(9001),
            "see the screenshot",
            &["https://cdn.example/shot.png".to_string()],
        )
        .await
        .unwrap();

    let posts = harness.gateway.webhook_posts.lock().unwrap().clone();
    assert!(posts[0].content.contains("see the screenshot"));
    assert!(posts[0].content.contains("[attachment] https://cdn.example/shot.png"));
}

#[tokio::test]
async fn test_oversized_content_is_truncated_with_marker() {
    let harness = TestHarness::new().with_guild(GUILD);
    let conversation = harness.seed_conversation(GUILD, USER);
    let relay = RelayService::new(&harness.ctx);

    let oversized = "x".repeat(2500);
    relay
        .relay_user_message(&conversation, Snowflake::new(9001), &oversized, &[])
        .await
        .unwrap();

    let posts = harness.gateway.webhook_posts.lock().unwrap().clone();
    assert!(posts[0].content.chars().count() <= 2000);
    assert!(posts[0].content.ends_with("… (truncated)"));

    // The tracked record keeps the full original
    let row = harness.conversations.get(USER).unwrap();
    assert_eq!(row.messages[0].content.len(), 2500);
}

#[tokio::test]
async fn test_webhook_failure_still_tracks_the_message() {
    let harness = TestHarness::new().with_guild(GUILD);
    let conversation = harness.seed_conversation(GUILD, USER);
    harness
        .gateway
        .fail_webhook_posts
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let relay = RelayService::new(&harness.ctx);

    relay
        .relay_user_message(&conversation, Snowflake::new(9001), "into the void", &[])
        .await
        .unwrap();

    let row = harness.conversations.get(USER).unwrap();
    assert_eq!(row.messages.len(), 1);
    assert!(row.messages[0].mirror_id.is_none());
}

#[tokio::test]
async fn test_edit_mirrors_reprocessed_content() {
    let harness = TestHarness::new().with_guild(GUILD);
    let conversation = harness.seed_conversation(GUILD, USER);
    let relay = RelayService::new(&harness.ctx);

    relay
        .relay_user_message(&conversation, Snowflake::new(9001), "helo staff", &[])
        .await
        .unwrap();

    let conversation = harness.conversations.get(USER).unwrap();
    relay
        .relay_edit(&conversation, Snowflake::new(9001), USER, "hello staff")
        .await
        .unwrap();

    let row = harness.conversations.get(USER).unwrap();
    assert!(row.messages[0].is_edited);
    assert_eq!(row.messages[0].current_content(), "hello staff");

    let edits = harness.gateway.webhook_edits.lock().unwrap().clone();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].0, conversation.thread_id);
    assert_eq!(edits[0].2, "hello staff");
}

#[tokio::test]
async fn test_delete_strikes_mirror_in_place() {
    let harness = TestHarness::new().with_guild(GUILD);
    let conversation = harness.seed_conversation(GUILD, USER);
    let relay = RelayService::new(&harness.ctx);

    relay
        .relay_user_message(&conversation, Snowflake::new(9001), "oops wrong channel", &[])
        .await
        .unwrap();

    let conversation = harness.conversations.get(USER).unwrap();
    relay
        .relay_delete(&conversation, Snowflake::new(9001), USER)
        .await
        .unwrap();

    let row = harness.conversations.get(USER).unwrap();
    assert!(row.messages[0].is_deleted);

    let mirror_id = row.messages[0].mirror_id.unwrap();
    assert_eq!(
        harness.gateway.content_of(mirror_id).unwrap(),
        "~~oops wrong channel~~ (deleted)"
    );
}

#[tokio::test]
async fn test_repeated_delete_does_not_double_wrap() {
    let harness = TestHarness::new().with_guild(GUILD);
    let conversation = harness.seed_conversation(GUILD, USER);
    let relay = RelayService::new(&harness.ctx);

    relay
        .relay_user_message(&conversation, Snowflake::new(9001), "oops", &[])
        .await
        .unwrap();

    let conversation = harness.conversations.get(USER).unwrap();
    relay.relay_delete(&conversation, Snowflake::new(9001), USER).await.unwrap();
    let conversation = harness.conversations.get(USER).unwrap();
    relay.relay_delete(&conversation, Snowflake::new(9001), USER).await.unwrap();

    let mirror_id = harness.conversations.get(USER).unwrap().messages[0]
        .mirror_id
        .unwrap();
    assert_eq!(
        harness.gateway.content_of(mirror_id).unwrap(),
        "~~oops~~ (deleted)"
    );
}

#[tokio::test]
async fn test_edit_after_delete_converges_to_edited_content() {
    let harness = TestHarness::new().with_guild(GUILD);
    let conversation = harness.seed_conversation(GUILD, USER);
    let relay = RelayService::new(&harness.ctx);

    relay
        .relay_user_message(&conversation, Snowflake::new(9001), "first draft", &[])
        .await
        .unwrap();

    let conversation = harness.conversations.get(USER).unwrap();
    relay.relay_delete(&conversation, Snowflake::new(9001), USER).await.unwrap();
    let conversation = harness.conversations.get(USER).unwrap();
    relay
        .relay_edit(&conversation, Snowflake::new(9001), USER, "second draft")
        .await
        .unwrap();

    let row = harness.conversations.get(USER).unwrap();
    assert!(!row.messages[0].is_deleted);
    assert_eq!(row.messages[0].current_content(), "second draft");

    let mirror_id = row.messages[0].mirror_id.unwrap();
    assert_eq!(harness.gateway.content_of(mirror_id).unwrap(), "second draft");
}

#[tokio::test]
async fn test_staff_edit_mirrors_into_the_dm() {
    let harness = TestHarness::new().with_guild(GUILD);
    let conversation = harness.seed_conversation(GUILD, USER);
    let relay = RelayService::new(&harness.ctx);

    relay
        .relay_staff_message(
            &conversation,
            Snowflake::new(9001),
            STAFF,
            "mod-bob",
            "plase wait",
            &[],
        )
        .await
        .unwrap();

    let conversation = harness.conversations.get(USER).unwrap();
    relay
        .relay_edit(&conversation, Snowflake::new(9001), STAFF, "please wait")
        .await
        .unwrap();

    let edits = harness.gateway.edits.lock().unwrap().clone();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].0, common::RecordingGateway::dm_channel_for(USER));
    assert_eq!(edits[0].2, "please wait");
}

#[tokio::test]
async fn test_edit_of_untracked_message_is_ignored() {
    let harness = TestHarness::new().with_guild(GUILD);
    let conversation = harness.seed_conversation(GUILD, USER);
    let relay = RelayService::new(&harness.ctx);

    // A bot status post in the thread is not a relayed message
    relay
        .relay_edit(&conversation, Snowflake::new(4242), STAFF, "whatever")
        .await
        .unwrap();

    assert!(harness.gateway.webhook_edits.lock().unwrap().is_empty());
    assert!(harness.gateway.edits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_mirror_side_id_resolves_the_same_message() {
    let harness = TestHarness::new().with_guild(GUILD);
    let conversation = harness.seed_conversation(GUILD, USER);
    let relay = RelayService::new(&harness.ctx);

    relay
        .relay_user_message(&conversation, Snowflake::new(9001), "hello", &[])
        .await
        .unwrap();

    // Address the delete by the thread-side copy's id instead of the DM's
    let conversation = harness.conversations.get(USER).unwrap();
    let mirror_id = conversation.messages[0].mirror_id.unwrap();
    relay.relay_delete(&conversation, mirror_id, STAFF).await.unwrap();

    assert!(harness.conversations.get(USER).unwrap().messages[0].is_deleted);
}
