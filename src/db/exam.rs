//! Exam and exam-record storage.

use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct ExamStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Exam {
    pub uuid: String,
    pub title: String,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct ExamRow {
    uuid: String,
    title: String,
    description: Option<String>,
    keywords: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<ExamRow> for Exam {
    fn from(row: ExamRow) -> Self {
        Self {
            uuid: row.uuid,
            title: row.title,
            description: row.description,
            keywords: row.keywords.and_then(|k| serde_json::from_str(&k).ok()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn keywords_to_json(keywords: &Option<Vec<String>>) -> Option<String> {
    keywords
        .as_ref()
        .and_then(|k| serde_json::to_string(k).ok())
}

impl ExamStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        uuid: &str,
        title: &str,
        description: Option<&str>,
        keywords: &Option<Vec<String>>,
    ) -> Result<Exam, sqlx::Error> {
        sqlx::query("INSERT INTO exams (uuid, title, description, keywords) VALUES (?, ?, ?, ?)")
            .bind(uuid)
            .bind(title)
            .bind(description)
            .bind(keywords_to_json(keywords))
            .execute(&self.pool)
            .await?;
        self.get(uuid).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get(&self, uuid: &str) -> Result<Option<Exam>, sqlx::Error> {
        let row: Option<ExamRow> = sqlx::query_as(
            "SELECT uuid, title, description, keywords, created_at, updated_at \
             FROM exams WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Exam::from))
    }

    pub async fn list(&self, keyword: Option<&str>) -> Result<Vec<Exam>, sqlx::Error> {
        let rows: Vec<ExamRow> = match keyword {
            Some(keyword) => {
                let pattern = format!("%{}%", keyword);
                sqlx::query_as(
                    "SELECT uuid, title, description, keywords, created_at, updated_at \
                     FROM exams \
                     WHERE title LIKE ? OR description LIKE ? OR keywords LIKE ? \
                     ORDER BY title ASC",
                )
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT uuid, title, description, keywords, created_at, updated_at \
                     FROM exams ORDER BY title ASC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(Exam::from).collect())
    }

    pub async fn update(
        &self,
        uuid: &str,
        title: Option<&str>,
        description: Option<&str>,
        keywords: &Option<Vec<String>>,
    ) -> Result<Option<Exam>, sqlx::Error> {
        let Some(current) = self.get(uuid).await? else {
            return Ok(None);
        };

        let title = title.unwrap_or(&current.title);
        let description = description.map(str::to_string).or(current.description);
        let keywords_json =
            keywords_to_json(keywords).or_else(|| keywords_to_json(&current.keywords));

        sqlx::query(
            "UPDATE exams SET title = ?, description = ?, keywords = ?, \
             updated_at = datetime('now') WHERE uuid = ?",
        )
        .bind(title)
        .bind(&description)
        .bind(&keywords_json)
        .bind(uuid)
        .execute(&self.pool)
        .await?;

        self.get(uuid).await
    }

    pub async fn delete(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM exams WHERE uuid = ?")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct ExamRecordStore {
    pool: SqlitePool,
}

/// A student's result for one exam paper.
#[derive(Debug, Clone, Serialize)]
pub struct ExamRecord {
    pub uuid: String,
    pub student_uuid: String,
    pub exam_uuid: String,
    pub score: Option<f64>,
    pub completion_date: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct ExamRecordRow {
    uuid: String,
    student_uuid: String,
    exam_uuid: String,
    score: Option<f64>,
    completion_date: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<ExamRecordRow> for ExamRecord {
    fn from(row: ExamRecordRow) -> Self {
        Self {
            uuid: row.uuid,
            student_uuid: row.student_uuid,
            exam_uuid: row.exam_uuid,
            score: row.score,
            completion_date: row.completion_date,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Optional filters for listing exam records.
#[derive(Debug, Clone, Default)]
pub struct ExamRecordFilter {
    pub student_uuid: Option<String>,
    pub exam_uuid: Option<String>,
}

const RECORD_COLUMNS: &str = "uuid, student_uuid, exam_uuid, score, completion_date, notes, \
     created_at, updated_at";

impl ExamRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        uuid: &str,
        student_uuid: &str,
        exam_uuid: &str,
        score: Option<f64>,
        completion_date: &str,
        notes: Option<&str>,
    ) -> Result<ExamRecord, sqlx::Error> {
        sqlx::query(
            "INSERT INTO exam_records \
             (uuid, student_uuid, exam_uuid, score, completion_date, notes) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(student_uuid)
        .bind(exam_uuid)
        .bind(score)
        .bind(completion_date)
        .bind(notes)
        .execute(&self.pool)
        .await?;
        self.get(uuid).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get(&self, uuid: &str) -> Result<Option<ExamRecord>, sqlx::Error> {
        let row: Option<ExamRecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM exam_records WHERE uuid = ?",
            RECORD_COLUMNS
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ExamRecord::from))
    }

    pub async fn list(&self, filter: &ExamRecordFilter) -> Result<Vec<ExamRecord>, sqlx::Error> {
        let mut sql = format!("SELECT {} FROM exam_records WHERE 1 = 1", RECORD_COLUMNS);
        if filter.student_uuid.is_some() {
            sql.push_str(" AND student_uuid = ?");
        }
        if filter.exam_uuid.is_some() {
            sql.push_str(" AND exam_uuid = ?");
        }
        sql.push_str(" ORDER BY completion_date DESC");

        let mut query = sqlx::query_as::<_, ExamRecordRow>(&sql);
        if let Some(student_uuid) = &filter.student_uuid {
            query = query.bind(student_uuid);
        }
        if let Some(exam_uuid) = &filter.exam_uuid {
            query = query.bind(exam_uuid);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(ExamRecord::from).collect())
    }

    pub async fn update(
        &self,
        uuid: &str,
        score: Option<f64>,
        completion_date: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Option<ExamRecord>, sqlx::Error> {
        let Some(current) = self.get(uuid).await? else {
            return Ok(None);
        };

        let score = score.or(current.score);
        let completion_date = completion_date.unwrap_or(&current.completion_date);
        let notes = notes.map(str::to_string).or(current.notes);

        sqlx::query(
            "UPDATE exam_records SET score = ?, completion_date = ?, notes = ?, \
             updated_at = datetime('now') WHERE uuid = ?",
        )
        .bind(score)
        .bind(completion_date)
        .bind(&notes)
        .bind(uuid)
        .execute(&self.pool)
        .await?;

        self.get(uuid).await
    }

    pub async fn delete(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM exam_records WHERE uuid = ?")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
