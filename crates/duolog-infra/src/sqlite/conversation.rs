//! SQLite conversation repository implementation.
//!
//! The upsert is a single `INSERT ... ON CONFLICT ... RETURNING`
//! statement, so concurrent first-time resolves of the same pair
//! converge on one row without a read-modify-write window.

use duolog_types::conversation::{CanonicalPair, Conversation};
use duolog_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid};

/// SQLite-backed implementation of `ConversationRepository`.
#[derive(Clone)]
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct ConversationRow {
    id: String,
    participant_low: String,
    participant_high: String,
    created_at: String,
    last_activity_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            participant_low: row.try_get("participant_low")?,
            participant_high: row.try_get("participant_high")?,
            created_at: row.try_get("created_at")?,
            last_activity_at: row.try_get("last_activity_at")?,
        })
    }

    fn into_conversation(self) -> Result<Conversation, RepositoryError> {
        Ok(Conversation {
            id: parse_uuid(&self.id, "conversation id")?,
            participant_low: parse_uuid(&self.participant_low, "participant_low")?,
            participant_high: parse_uuid(&self.participant_high, "participant_high")?,
            created_at: parse_datetime(&self.created_at)?,
            last_activity_at: parse_datetime(&self.last_activity_at)?,
        })
    }
}

impl duolog_core::repository::ConversationRepository for SqliteConversationRepository {
    async fn upsert_pair(&self, pair: CanonicalPair) -> Result<Uuid, RepositoryError> {
        let now = format_datetime(&chrono::Utc::now());

        // The no-op DO UPDATE makes the conflicting row visible to
        // RETURNING, so both the insert and the lost race yield an id.
        let row = sqlx::query(
            r#"INSERT INTO conversations (id, participant_low, participant_high, created_at, last_activity_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(participant_low, participant_high)
               DO UPDATE SET participant_low = participant_low
               RETURNING id"#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(pair.low().to_string())
        .bind(pair.high().to_string())
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let id: String = row
            .try_get("id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        parse_uuid(&id, "conversation id")
    }

    async fn find(&self, id: Uuid) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let conv_row = ConversationRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(conv_row.into_conversation()?))
            }
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user: Uuid) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM conversations
               WHERE participant_low = ? OR participant_high = ?
               ORDER BY last_activity_at DESC"#,
        )
        .bind(user.to_string())
        .bind(user.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in &rows {
            let conv_row = ConversationRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            conversations.push(conv_row.into_conversation()?);
        }

        Ok(conversations)
    }
}
