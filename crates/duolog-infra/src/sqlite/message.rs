//! SQLite message repository implementation.
//!
//! Insert and the activity bump on the owning conversation run in one
//! transaction on the writer pool. The chat-list lookups are batch
//! queries over the conversation id set: latest message via a window
//! function, unread counts via GROUP BY.

use chrono::{DateTime, Utc};
use duolog_types::conversation::CanonicalPair;
use duolog_types::error::RepositoryError;
use duolog_types::message::Message;
use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, placeholders};

/// SQLite-backed implementation of `MessageRepository`.
#[derive(Clone)]
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct MessageRow {
    id: String,
    conversation_id: String,
    sender_id: String,
    content: String,
    created_at: String,
    read_at: Option<String>,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            sender_id: row.try_get("sender_id")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            read_at: row.try_get("read_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        Ok(Message {
            id: parse_uuid(&self.id, "message id")?,
            conversation_id: parse_uuid(&self.conversation_id, "conversation_id")?,
            sender_id: parse_uuid(&self.sender_id, "sender_id")?,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
            read_at: self.read_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

impl duolog_core::repository::MessageRepository for SqliteMessageRepository {
    async fn insert(&self, message: &Message) -> Result<CanonicalPair, RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        // Bumping the activity timestamp doubles as the existence check;
        // RETURNING hands back the pair for feed routing.
        let conv = sqlx::query(
            r#"UPDATE conversations SET last_activity_at = ?
               WHERE id = ?
               RETURNING participant_low, participant_high"#,
        )
        .bind(format_datetime(&message.created_at))
        .bind(message.conversation_id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?
        .ok_or(RepositoryError::NotFound)?;

        sqlx::query(
            r#"INSERT INTO messages (id, conversation_id, sender_id, content, created_at, read_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.conversation_id.to_string())
        .bind(message.sender_id.to_string())
        .bind(&message.content)
        .bind(format_datetime(&message.created_at))
        .bind(message.read_at.as_ref().map(format_datetime))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let low: String = conv
            .try_get("participant_low")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let high: String = conv
            .try_get("participant_high")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        CanonicalPair::from_ordered(
            parse_uuid(&low, "participant_low")?,
            parse_uuid(&high, "participant_high")?,
        )
        .ok_or_else(|| RepositoryError::Query("conversation pair not canonical".to_string()))
    }

    async fn list(&self, conversation_id: Uuid) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM messages
               WHERE conversation_id = ?
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let msg_row =
                MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(msg_row.into_message()?);
        }

        Ok(messages)
    }

    async fn latest_by_conversation(
        &self,
        conversation_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Message>, RepositoryError> {
        if conversation_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            r#"SELECT id, conversation_id, sender_id, content, created_at, read_at FROM (
                   SELECT m.*, ROW_NUMBER() OVER (
                       PARTITION BY conversation_id
                       ORDER BY created_at DESC, id DESC
                   ) AS rn
                   FROM messages m
                   WHERE conversation_id IN ({})
               ) WHERE rn = 1"#,
            placeholders(conversation_ids.len())
        );

        let mut query = sqlx::query(&sql);
        for id in conversation_ids {
            query = query.bind(id.to_string());
        }
        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut latest = HashMap::with_capacity(rows.len());
        for row in &rows {
            let message = MessageRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_message()?;
            latest.insert(message.conversation_id, message);
        }

        Ok(latest)
    }

    async fn unread_counts(
        &self,
        conversation_ids: &[Uuid],
        for_user: Uuid,
    ) -> Result<HashMap<Uuid, u64>, RepositoryError> {
        if conversation_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            r#"SELECT conversation_id, COUNT(*) as cnt FROM messages
               WHERE conversation_id IN ({})
                 AND sender_id != ?
                 AND read_at IS NULL
               GROUP BY conversation_id"#,
            placeholders(conversation_ids.len())
        );

        let mut query = sqlx::query(&sql);
        for id in conversation_ids {
            query = query.bind(id.to_string());
        }
        let rows = query
            .bind(for_user.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in &rows {
            let conversation_id: String = row
                .try_get("conversation_id")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let count: i64 = row
                .try_get("cnt")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            counts.insert(parse_uuid(&conversation_id, "conversation_id")?, count as u64);
        }

        Ok(counts)
    }

    async fn unread_count(
        &self,
        conversation_id: Uuid,
        for_user: Uuid,
    ) -> Result<u64, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT COUNT(*) as cnt FROM messages
               WHERE conversation_id = ? AND sender_id != ? AND read_at IS NULL"#,
        )
        .bind(conversation_id.to_string())
        .bind(for_user.to_string())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(count as u64)
    }

    async fn mark_read_if_unread(
        &self,
        reader: Uuid,
        message_ids: &[Uuid],
        read_at_time: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        if message_ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            r#"UPDATE messages SET read_at = ?
               WHERE id IN ({})
                 AND read_at IS NULL
                 AND sender_id != ?"#,
            placeholders(message_ids.len())
        );

        let mut query = sqlx::query(&sql).bind(format_datetime(&read_at_time));
        for id in message_ids {
            query = query.bind(id.to_string());
        }
        let result = query
            .bind(reader.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
