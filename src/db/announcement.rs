//! Announcement storage.

use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct AnnouncementStore {
    pool: SqlitePool,
}

/// A system announcement. Publisher identity is stamped from the
/// authenticated caller, never taken from the request body.
#[derive(Debug, Clone, Serialize)]
pub struct Announcement {
    pub uuid: String,
    pub title: String,
    pub content: String,
    pub publisher_uuid: String,
    pub publisher_name: String,
    pub publisher_role: String,
    pub is_important: bool,
    pub expires_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct AnnouncementRow {
    uuid: String,
    title: String,
    content: String,
    publisher_uuid: String,
    publisher_name: String,
    publisher_role: String,
    is_important: bool,
    expires_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<AnnouncementRow> for Announcement {
    fn from(row: AnnouncementRow) -> Self {
        Self {
            uuid: row.uuid,
            title: row.title,
            content: row.content,
            publisher_uuid: row.publisher_uuid,
            publisher_name: row.publisher_name,
            publisher_role: row.publisher_role,
            is_important: row.is_important,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "uuid, title, content, publisher_uuid, publisher_name, publisher_role, \
     is_important, expires_at, created_at, updated_at";

impl AnnouncementStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        uuid: &str,
        title: &str,
        content: &str,
        publisher_uuid: &str,
        publisher_name: &str,
        publisher_role: &str,
        is_important: bool,
        expires_at: Option<&str>,
    ) -> Result<Announcement, sqlx::Error> {
        sqlx::query(
            "INSERT INTO announcements \
             (uuid, title, content, publisher_uuid, publisher_name, publisher_role, \
              is_important, expires_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(title)
        .bind(content)
        .bind(publisher_uuid)
        .bind(publisher_name)
        .bind(publisher_role)
        .bind(is_important)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        self.get(uuid).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get(&self, uuid: &str) -> Result<Option<Announcement>, sqlx::Error> {
        let row: Option<AnnouncementRow> = sqlx::query_as(&format!(
            "SELECT {} FROM announcements WHERE uuid = ?",
            COLUMNS
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Announcement::from))
    }

    /// List announcements, newest first, skipping expired ones.
    pub async fn list(&self, limit: i64) -> Result<Vec<Announcement>, sqlx::Error> {
        let rows: Vec<AnnouncementRow> = sqlx::query_as(&format!(
            "SELECT {} FROM announcements \
             WHERE expires_at IS NULL OR expires_at > datetime('now') \
             ORDER BY created_at DESC LIMIT ?",
            COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Announcement::from).collect())
    }

    pub async fn update(
        &self,
        uuid: &str,
        title: Option<&str>,
        content: Option<&str>,
        is_important: Option<bool>,
        expires_at: Option<&str>,
    ) -> Result<Option<Announcement>, sqlx::Error> {
        let Some(current) = self.get(uuid).await? else {
            return Ok(None);
        };

        let title = title.unwrap_or(&current.title);
        let content = content.unwrap_or(&current.content);
        let is_important = is_important.unwrap_or(current.is_important);
        let expires_at = expires_at.map(str::to_string).or(current.expires_at);

        sqlx::query(
            "UPDATE announcements SET title = ?, content = ?, is_important = ?, expires_at = ?, \
             updated_at = datetime('now') WHERE uuid = ?",
        )
        .bind(title)
        .bind(content)
        .bind(is_important)
        .bind(&expires_at)
        .bind(uuid)
        .execute(&self.pool)
        .await?;

        self.get(uuid).await
    }

    pub async fn delete(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM announcements WHERE uuid = ?")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
