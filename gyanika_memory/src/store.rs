//! Postgres-backed conversation store.
//!
//! CRUD over the `users`, `conversations`, and `messages` tables. Every
//! call is a blocking round-trip to the database; the memory layer decides
//! how to degrade when one fails.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use tracing::{debug, info};
use uuid::Uuid;

use gyanika_core::{ConversationStore, Role, SessionRef, StoredMessage, UserRef};
use gyanika_entities::{conversations, messages, users};

/// Conversation storage over a Postgres connection.
pub struct PostgresStore {
    db: DatabaseConnection,
}

impl PostgresStore {
    /// Connect to the database.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        info!("Connecting to database for PostgresStore");
        let db = Database::connect(database_url).await?;
        info!("PostgresStore initialized");
        Ok(Self { db })
    }

    /// Get a reference to the database connection.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl ConversationStore for PostgresStore {
    async fn create_or_get_user(
        &self,
        identifier: &str,
        display_name: &str,
    ) -> anyhow::Result<UserRef> {
        if let Some(existing) = users::Entity::find()
            .filter(users::Column::Username.eq(identifier))
            .one(&self.db)
            .await?
        {
            debug!("Found existing user: {identifier} -> {}", existing.id);
            return Ok(UserRef(existing.id));
        }

        let model = users::ActiveModel {
            id: Set(Uuid::now_v7()),
            username: Set(identifier.to_string()),
            full_name: Set(display_name.to_string()),
            created_at: Set(Utc::now()),
        };
        let inserted = model.insert(&self.db).await?;

        info!("Created new user: {identifier} -> {}", inserted.id);
        Ok(UserRef(inserted.id))
    }

    async fn open_session(&self, user: UserRef, room_name: &str) -> anyhow::Result<SessionRef> {
        let model = conversations::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(user.0),
            room_name: Set(room_name.to_string()),
            started_at: Set(Utc::now()),
            ended_at: Set(None),
            duration_seconds: Set(None),
            summary: Set(None),
            topic: Set(None),
        };
        let inserted = model.insert(&self.db).await?;

        info!("Started conversation: {}", inserted.id);
        Ok(SessionRef(inserted.id))
    }

    async fn append_message(
        &self,
        session: SessionRef,
        role: Role,
        content: &str,
    ) -> anyhow::Result<()> {
        let model = messages::ActiveModel {
            id: Set(Uuid::now_v7()),
            conversation_id: Set(session.0),
            role: Set(role.to_string()),
            content: Set(content.to_string()),
            created_at: Set(Utc::now()),
        };
        model.insert(&self.db).await?;

        debug!("Saved {role} message to session {}", session.0);
        Ok(())
    }

    async fn list_prior_messages(
        &self,
        user: UserRef,
        exclude: SessionRef,
        limit: u64,
    ) -> anyhow::Result<Vec<StoredMessage>> {
        let rows = messages::Entity::find()
            .join(JoinType::InnerJoin, messages::Relation::Conversation.def())
            .filter(conversations::Column::UserId.eq(user.0))
            .filter(messages::Column::ConversationId.ne(exclude.0))
            .order_by_desc(messages::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(StoredMessage {
                    role: row.role.parse()?,
                    content: row.content,
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    async fn list_session_messages(
        &self,
        session: SessionRef,
        limit: u64,
    ) -> anyhow::Result<Vec<StoredMessage>> {
        let rows = messages::Entity::find()
            .filter(messages::Column::ConversationId.eq(session.0))
            .order_by_asc(messages::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(StoredMessage {
                    role: row.role.parse()?,
                    content: row.content,
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    async fn close_session(
        &self,
        session: SessionRef,
        summary: Option<&str>,
        topic: Option<&str>,
        duration_seconds: i64,
    ) -> anyhow::Result<()> {
        let model = conversations::ActiveModel {
            id: Set(session.0),
            ended_at: Set(Some(Utc::now())),
            duration_seconds: Set(Some(duration_seconds)),
            summary: Set(summary.map(ToString::to_string)),
            topic: Set(topic.map(ToString::to_string)),
            ..Default::default()
        };
        model.update(&self.db).await?;

        info!("Ended conversation: {}", session.0);
        Ok(())
    }
}
