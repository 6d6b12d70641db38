//! SQLite profile store implementation.
//!
//! The sync engine only reads profiles; `upsert` exists so the profile
//! collaborator has a storage home and so tests can seed display data.

use duolog_types::error::RepositoryError;
use duolog_types::profile::ProfileSnapshot;
use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_uuid, placeholders};

/// SQLite-backed implementation of `ProfileStore`.
#[derive(Clone)]
pub struct SqliteProfileRepository {
    pool: DatabasePool,
}

impl SqliteProfileRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Insert or replace a profile's display data.
    pub async fn upsert(&self, profile: &ProfileSnapshot) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO profiles (user_id, display_name, avatar_url, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(user_id) DO UPDATE SET
                   display_name = excluded.display_name,
                   avatar_url = excluded.avatar_url,
                   updated_at = excluded.updated_at"#,
        )
        .bind(profile.user_id.to_string())
        .bind(&profile.display_name)
        .bind(&profile.avatar_url)
        .bind(format_datetime(&chrono::Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}

fn snapshot_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProfileSnapshot, RepositoryError> {
    let user_id: String = row
        .try_get("user_id")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let display_name: String = row
        .try_get("display_name")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let avatar_url: Option<String> = row
        .try_get("avatar_url")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    Ok(ProfileSnapshot {
        user_id: parse_uuid(&user_id, "user_id")?,
        display_name,
        avatar_url,
    })
}

impl duolog_core::repository::ProfileStore for SqliteProfileRepository {
    async fn get(&self, user_id: Uuid) -> Result<Option<ProfileSnapshot>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM profiles WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(snapshot_from_row).transpose()
    }

    async fn get_many(
        &self,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ProfileSnapshot>, RepositoryError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT * FROM profiles WHERE user_id IN ({})",
            placeholders(user_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in user_ids {
            query = query.bind(id.to_string());
        }
        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut profiles = HashMap::with_capacity(rows.len());
        for row in &rows {
            let snapshot = snapshot_from_row(row)?;
            profiles.insert(snapshot.user_id, snapshot);
        }

        Ok(profiles)
    }
}
