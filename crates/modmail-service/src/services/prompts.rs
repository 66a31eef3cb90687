//! Pending prompt registry
//!
//! The confirm and guild-pick prompts of the open flow are the only
//! user-cancelable waits in the core. Each pending prompt lives in a keyed
//! registry owned by the context (created on the first DM, torn down on
//! completion or timeout) instead of a process-wide global map. The timeout
//! task is spawned by the lifecycle service, which removes the entry by token
//! so a prompt that was answered and re-created is never reaped by a stale
//! timer.

use std::time::Duration;

use dashmap::DashMap;

use modmail_core::Snowflake;

/// How long a prompt waits for an answer before auto-cancelling
pub const PROMPT_TIMEOUT: Duration = Duration::from_secs(300);

/// Where the open flow is waiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptStage {
    /// Waiting for the user to confirm they want to open a conversation
    AwaitConfirm,
    /// Waiting for the user to pick one of the shared configured guilds
    AwaitGuildPick { candidates: Vec<Snowflake> },
}

/// A user's in-flight open prompt
#[derive(Debug, Clone)]
pub struct PendingPrompt {
    pub user_id: Snowflake,
    /// Token distinguishing this prompt from any later one for the same user
    pub token: Snowflake,
    /// Platform id of the DM that started the request
    pub source_id: Snowflake,
    pub stage: PromptStage,
    /// The original message, relayed once the conversation exists
    pub content: String,
    pub attachment_urls: Vec<String>,
    pub author_name: String,
}

/// Registry of pending open prompts, keyed by user
#[derive(Debug, Default)]
pub struct PendingPromptRegistry {
    entries: DashMap<Snowflake, PendingPrompt>,
}

impl PendingPromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the user has a prompt in flight
    pub fn contains(&self, user_id: Snowflake) -> bool {
        self.entries.contains_key(&user_id)
    }

    /// Register a prompt, replacing any stale one for the same user
    pub fn insert(&self, prompt: PendingPrompt) {
        self.entries.insert(prompt.user_id, prompt);
    }

    /// Look at the user's prompt without removing it
    pub fn get(&self, user_id: Snowflake) -> Option<PendingPrompt> {
        self.entries.get(&user_id).map(|e| e.clone())
    }

    /// Advance the user's prompt to a new stage, keeping the token
    pub fn set_stage(&self, user_id: Snowflake, stage: PromptStage) {
        if let Some(mut entry) = self.entries.get_mut(&user_id) {
            entry.stage = stage;
        }
    }

    /// Take the prompt out of the registry (completion path)
    pub fn take(&self, user_id: Snowflake) -> Option<PendingPrompt> {
        self.entries.remove(&user_id).map(|(_, p)| p)
    }

    /// Remove the prompt only if it still carries `token` (timeout path).
    /// Returns the prompt when the timer was the one to win.
    pub fn take_if_token(&self, user_id: Snowflake, token: Snowflake) -> Option<PendingPrompt> {
        self.entries
            .remove_if(&user_id, |_, p| p.token == token)
            .map(|(_, p)| p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(user: i64, token: i64) -> PendingPrompt {
        PendingPrompt {
            user_id: Snowflake::new(user),
            token: Snowflake::new(token),
            source_id: Snowflake::new(999),
            stage: PromptStage::AwaitConfirm,
            content: "help me please, something broke".to_string(),
            attachment_urls: Vec::new(),
            author_name: "alice".to_string(),
        }
    }

    #[test]
    fn test_take_removes_entry() {
        let registry = PendingPromptRegistry::new();
        registry.insert(prompt(1, 100));
        assert!(registry.contains(Snowflake::new(1)));

        let taken = registry.take(Snowflake::new(1)).unwrap();
        assert_eq!(taken.token, Snowflake::new(100));
        assert!(!registry.contains(Snowflake::new(1)));
    }

    #[test]
    fn test_stale_timer_does_not_reap_new_prompt() {
        let registry = PendingPromptRegistry::new();
        registry.insert(prompt(1, 100));
        // User answered and started over; a newer prompt replaced the entry
        registry.insert(prompt(1, 200));

        assert!(registry
            .take_if_token(Snowflake::new(1), Snowflake::new(100))
            .is_none());
        assert!(registry.contains(Snowflake::new(1)));

        assert!(registry
            .take_if_token(Snowflake::new(1), Snowflake::new(200))
            .is_some());
    }

    #[test]
    fn test_set_stage_advances_prompt() {
        let registry = PendingPromptRegistry::new();
        registry.insert(prompt(1, 100));
        registry.set_stage(
            Snowflake::new(1),
            PromptStage::AwaitGuildPick {
                candidates: vec![Snowflake::new(5)],
            },
        );

        let p = registry.get(Snowflake::new(1)).unwrap();
        assert!(matches!(p.stage, PromptStage::AwaitGuildPick { .. }));
        assert_eq!(p.token, Snowflake::new(100));
    }
}
