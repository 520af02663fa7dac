//! Per-session conversational memory.
//!
//! `SessionMemory` keeps a bounded window of the current session's exchanges
//! in process and lazily builds a cached summary of prior sessions from the
//! persistent store. The composed context is injected into the voice agent's
//! instructions before each reply.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use gyanika_core::{
    ConversationStore, ConversationTurn, Role, SessionRef, StoredMessage, UserRef, truncate_chars,
};

use crate::dedup::DuplicateGuard;

/// Tuning knobs for a session memory.
#[derive(Debug, Clone)]
pub struct MemoryOptions {
    /// Maximum turns kept in the short-term buffer (FIFO eviction).
    pub short_term_capacity: usize,
    /// Short-term turns rendered into the context prompt.
    pub context_turns: usize,
    /// Character cap for short-term bullet lines.
    pub short_term_snippet_chars: usize,
    /// Prior-session messages fetched from the store.
    pub recall_fetch_limit: u64,
    /// Most recent prior messages kept after fetching.
    pub recall_keep: usize,
    /// Character cap for recalled bullet lines.
    pub recall_snippet_chars: usize,
    /// Debounce window for identical user utterances.
    pub duplicate_window: Duration,
    /// Display name used for the assistant in rendered memory.
    pub assistant_name: String,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            short_term_capacity: 5,
            context_turns: 3,
            short_term_snippet_chars: 80,
            recall_fetch_limit: 30,
            recall_keep: 10,
            recall_snippet_chars: 100,
            duplicate_window: Duration::seconds(2),
            assistant_name: "Gyanika".to_string(),
        }
    }
}

/// Errors surfaced by the memory itself.
///
/// Store failures never appear here; they degrade to "no memory available
/// this turn" and are only logged.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory session already ended for user {0}")]
    SessionEnded(String),
}

/// What `append_turn` did with a candidate exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Turn accepted into the buffer and persisted.
    Appended,
    /// User or assistant text was empty after trimming.
    EmptyIgnored,
    /// Identical user utterance inside the debounce window.
    DuplicateSuppressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemoryState {
    Active,
    Ended,
}

/// Conversational memory for one (user, session) pair.
///
/// Owned by the single session that created it; the process-wide
/// [`crate::MemoryRegistry`] guards the shared lookup, but each instance is
/// only ever touched by its own session's callbacks.
pub struct SessionMemory {
    store: Arc<dyn ConversationStore>,
    user: UserRef,
    session: SessionRef,
    user_id: String,
    user_name: String,
    options: MemoryOptions,
    short_term: VecDeque<ConversationTurn>,
    recall_cache: Option<String>,
    duplicate_guard: DuplicateGuard,
    started_at: DateTime<Utc>,
    state: MemoryState,
}

impl SessionMemory {
    /// Open a memory for a user, creating the user row if needed and
    /// starting a fresh conversation session in the store.
    pub async fn open(
        store: Arc<dyn ConversationStore>,
        user_id: &str,
        user_name: &str,
        options: MemoryOptions,
    ) -> anyhow::Result<Self> {
        let user = store.create_or_get_user(user_id, user_name).await?;
        let started_at = Utc::now();
        let room_name = format!("session_{}", started_at.format("%Y%m%d_%H%M%S"));
        let session = store.open_session(user, &room_name).await?;

        info!(user_id, user_name, session = %session.0, "session memory opened");

        let duplicate_guard = DuplicateGuard::new(options.duplicate_window);
        Ok(Self {
            store,
            user,
            session,
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            options,
            short_term: VecDeque::new(),
            recall_cache: None,
            duplicate_guard,
            started_at,
            state: MemoryState::Active,
        })
    }

    /// Record one complete exchange.
    ///
    /// The turn is pushed onto the short-term buffer (evicting the oldest
    /// entry at capacity), both sides are written to the store, and the
    /// long-term recall cache is invalidated. Persistence failure is logged
    /// and swallowed so short-term memory keeps working when the store is
    /// down.
    pub async fn append_turn(
        &mut self,
        user_msg: &str,
        agent_msg: &str,
    ) -> Result<AppendOutcome, MemoryError> {
        self.ensure_active()?;

        let user_msg = user_msg.trim();
        let agent_msg = agent_msg.trim();
        if user_msg.is_empty() || agent_msg.is_empty() {
            debug!(user_id = %self.user_id, "ignoring incomplete turn");
            return Ok(AppendOutcome::EmptyIgnored);
        }

        if self.duplicate_guard.is_duplicate(user_msg, Utc::now()) {
            debug!(user_id = %self.user_id, "suppressing duplicate transcript delivery");
            return Ok(AppendOutcome::DuplicateSuppressed);
        }

        self.short_term
            .push_back(ConversationTurn::new(user_msg, agent_msg));
        while self.short_term.len() > self.options.short_term_capacity {
            self.short_term.pop_front();
        }

        // Best-effort persistence: the in-memory buffer above is already
        // updated, so a store outage only degrades long-term memory.
        for (role, content) in [(Role::User, user_msg), (Role::Assistant, agent_msg)] {
            if let Err(e) = self.store.append_message(self.session, role, content).await {
                warn!(user_id = %self.user_id, %role, "failed to persist message: {e}");
            }
        }

        self.recall_cache = None;

        debug!(
            user_id = %self.user_id,
            buffered = self.short_term.len(),
            "turn recorded"
        );
        Ok(AppendOutcome::Appended)
    }

    /// Formatted summary of the user's prior sessions.
    ///
    /// The first call per session fetches from the store and memoizes the
    /// rendered text; later calls return it unchanged until `append_turn`
    /// invalidates it. `query` is accepted for parity with the caller's
    /// retrieval interface but does not alter the cached path. A user with
    /// no history gets an empty string, not an error.
    pub async fn recall(&mut self, query: Option<&str>) -> Result<String, MemoryError> {
        self.ensure_active()?;

        if let Some(cached) = &self.recall_cache {
            debug!(user_id = %self.user_id, ?query, "recall served from session cache");
            return Ok(cached.clone());
        }

        let fetched = self
            .store
            .list_prior_messages(self.user, self.session, self.options.recall_fetch_limit)
            .await;

        let messages = match fetched {
            Ok(messages) => messages,
            Err(e) => {
                // Degrade without caching so a later call can retry the store.
                warn!(user_id = %self.user_id, "long-term recall unavailable: {e}");
                return Ok(String::new());
            }
        };

        if messages.is_empty() {
            info!(user_id = %self.user_id, "no past conversations, new user");
            self.recall_cache = Some(String::new());
            return Ok(String::new());
        }

        let rendered = render_recall(
            &self.user_name,
            &self.options.assistant_name,
            &messages,
            self.options.recall_keep,
            self.options.recall_snippet_chars,
        );

        info!(
            user_id = %self.user_id,
            fetched = messages.len(),
            "recalled past conversations"
        );
        self.recall_cache = Some(rendered.clone());
        Ok(rendered)
    }

    /// Compose the memory context injected into the agent's instructions.
    ///
    /// Combines the most recent short-term turns with the long-term recall
    /// under a header naming the user. Empty when there is nothing to say.
    pub async fn build_context_prompt(
        &mut self,
        query: Option<&str>,
    ) -> Result<String, MemoryError> {
        self.ensure_active()?;

        let short_term = render_short_term(
            &self.short_term,
            self.options.context_turns,
            self.options.short_term_snippet_chars,
            &self.options.assistant_name,
        );
        let past = self.recall(query).await?;

        if short_term.is_empty() && past.is_empty() {
            return Ok(String::new());
        }

        Ok(format!("# Memory for {}\n{short_term}\n{past}", self.user_name)
            .trim()
            .to_string())
    }

    /// Close the persisted session record and mark this memory ended.
    ///
    /// Records wall-clock duration plus optional summary and topic. After
    /// this call every operation, including a second `end_session`, fails
    /// with [`MemoryError::SessionEnded`].
    pub async fn end_session(
        &mut self,
        summary: Option<&str>,
        topic: Option<&str>,
    ) -> Result<(), MemoryError> {
        self.ensure_active()?;

        let duration_seconds = (Utc::now() - self.started_at).num_seconds();
        match self
            .store
            .close_session(self.session, summary, topic, duration_seconds)
            .await
        {
            Ok(()) => info!(
                user_id = %self.user_id,
                session = %self.session.0,
                duration_seconds,
                "session ended"
            ),
            Err(e) => warn!(user_id = %self.user_id, "failed to close session record: {e}"),
        }

        self.state = MemoryState::Ended;
        Ok(())
    }

    /// Turns currently held in the short-term buffer, oldest first.
    #[must_use]
    pub const fn short_term(&self) -> &VecDeque<ConversationTurn> {
        &self.short_term
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    #[must_use]
    pub const fn session_ref(&self) -> SessionRef {
        self.session
    }

    #[must_use]
    pub const fn is_ended(&self) -> bool {
        matches!(self.state, MemoryState::Ended)
    }

    fn ensure_active(&self) -> Result<(), MemoryError> {
        match self.state {
            MemoryState::Active => Ok(()),
            MemoryState::Ended => Err(MemoryError::SessionEnded(self.user_id.clone())),
        }
    }
}

/// Render prior-session messages as a brief history block.
///
/// `messages` arrive newest first from the store; the most recent `keep`
/// are shown in chronological order, each truncated to `snippet_chars`.
fn render_recall(
    user_name: &str,
    assistant_name: &str,
    messages: &[StoredMessage],
    keep: usize,
    snippet_chars: usize,
) -> String {
    let mut chronological: Vec<&StoredMessage> = messages.iter().rev().collect();
    let start = chronological.len().saturating_sub(keep);
    let recent = chronological.split_off(start);

    let mut text = format!("## Brief History with {user_name}\n\n");
    for msg in recent {
        let label = match msg.role {
            Role::User => "User",
            Role::Assistant => assistant_name,
        };
        let content = truncate_chars(&msg.content, snippet_chars);
        text.push_str(&format!("- **{label}**: {content}\n"));
    }
    text
}

/// Render the tail of the short-term buffer as bullet lines.
fn render_short_term(
    turns: &VecDeque<ConversationTurn>,
    context_turns: usize,
    snippet_chars: usize,
    assistant_name: &str,
) -> String {
    if turns.is_empty() {
        return String::new();
    }

    let start = turns.len().saturating_sub(context_turns);
    let mut text = String::from("## Recent (Current Session)\n");
    for turn in turns.iter().skip(start) {
        let user_text = truncate_chars(&turn.user, snippet_chars);
        let agent_text = truncate_chars(&turn.assistant, snippet_chars);
        text.push_str(&format!(
            "- User: {user_text}\n- {assistant_name}: {agent_text}\n"
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(role: Role, content: &str, minutes_ago: i64) -> StoredMessage {
        StoredMessage {
            role,
            content: content.to_string(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn recall_renders_most_recent_in_chronological_order() {
        // Newest first, as the store returns them.
        let messages = vec![
            stored(Role::Assistant, "answer two", 1),
            stored(Role::User, "question two", 2),
            stored(Role::Assistant, "answer one", 3),
            stored(Role::User, "question one", 4),
        ];

        let text = render_recall("Asha", "Gyanika", &messages, 2, 100);

        assert!(text.starts_with("## Brief History with Asha"));
        // Only the two most recent, oldest of them first.
        assert!(!text.contains("question one"));
        let q2 = text.find("question two").unwrap();
        let a2 = text.find("answer two").unwrap();
        assert!(q2 < a2);
        assert!(text.contains("- **User**: question two"));
        assert!(text.contains("- **Gyanika**: answer two"));
    }

    #[test]
    fn recall_truncates_long_content() {
        let long = "x".repeat(150);
        let messages = vec![stored(Role::User, &long, 1)];

        let text = render_recall("Asha", "Gyanika", &messages, 10, 100);

        assert!(text.contains(&format!("{}...", "x".repeat(100))));
        assert!(!text.contains(&"x".repeat(101)));
    }

    #[test]
    fn short_term_renders_last_three_turns() {
        let mut turns = VecDeque::new();
        for i in 1..=5 {
            turns.push_back(ConversationTurn::new(
                format!("question {i}"),
                format!("answer {i}"),
            ));
        }

        let text = render_short_term(&turns, 3, 80, "Gyanika");

        assert!(text.starts_with("## Recent (Current Session)"));
        assert!(!text.contains("question 2"));
        assert!(text.contains("- User: question 3"));
        assert!(text.contains("- Gyanika: answer 5"));
    }

    #[test]
    fn short_term_empty_renders_nothing() {
        let turns = VecDeque::new();
        assert_eq!(render_short_term(&turns, 3, 80, "Gyanika"), "");
    }
}
