#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod util;

pub use util::{content_hash, truncate_chars};

/// Speaker of a stored message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(anyhow::anyhow!("unknown role: {s}")),
        }
    }
}

/// One complete exchange: a user utterance paired with the assistant reply.
///
/// Immutable once created; owned by the memory that appended it.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub user: String,
    pub assistant: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    #[must_use]
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
            created_at: Utc::now(),
        }
    }
}

/// A message as read back from the persistent store.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Handle to a user row in the persistent store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserRef(pub Uuid);

/// Handle to a conversation (session) row in the persistent store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionRef(pub Uuid);

/// Persistent conversation storage consumed by the memory layer.
///
/// Implementations are expected to be slow (network + query latency);
/// callers must not invoke these from a per-audio-frame path. No retries
/// are performed here and no timeouts are enforced beyond the driver's own.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Look up a user by identifier, creating the row if absent.
    async fn create_or_get_user(
        &self,
        identifier: &str,
        display_name: &str,
    ) -> anyhow::Result<UserRef>;

    /// Open a new conversation session for the user.
    async fn open_session(&self, user: UserRef, room_name: &str) -> anyhow::Result<SessionRef>;

    /// Append one message to a session. Durable on return.
    async fn append_message(
        &self,
        session: SessionRef,
        role: Role,
        content: &str,
    ) -> anyhow::Result<()>;

    /// Messages from the user's *prior* sessions, newest first, capped at
    /// `limit`. The current session is excluded so recall never echoes the
    /// conversation in progress.
    async fn list_prior_messages(
        &self,
        user: UserRef,
        exclude: SessionRef,
        limit: u64,
    ) -> anyhow::Result<Vec<StoredMessage>>;

    /// Messages of a single session, oldest first, capped at `limit`.
    async fn list_session_messages(
        &self,
        session: SessionRef,
        limit: u64,
    ) -> anyhow::Result<Vec<StoredMessage>>;

    /// Mark a session closed, recording duration and optional metadata.
    async fn close_session(
        &self,
        session: SessionRef,
        summary: Option<&str>,
        topic: Option<&str>,
        duration_seconds: i64,
    ) -> anyhow::Result<()>;
}
