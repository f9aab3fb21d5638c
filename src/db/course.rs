//! Course and course-record storage.

use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct CourseStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Course {
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct CourseRow {
    uuid: String,
    name: String,
    description: Option<String>,
    keywords: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Self {
            uuid: row.uuid,
            name: row.name,
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

impl CourseStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        uuid: &str,
        name: &str,
        description: Option<&str>,
        keywords: &Option<Vec<String>>,
    ) -> Result<Course, sqlx::Error> {
        sqlx::query("INSERT INTO courses (uuid, name, description, keywords) VALUES (?, ?, ?, ?)")
            .bind(uuid)
            .bind(name)
            .bind(description)
            .bind(keywords_to_json(keywords))
            .execute(&self.pool)
            .await?;
        self.get(uuid)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get(&self, uuid: &str) -> Result<Option<Course>, sqlx::Error> {
        let row: Option<CourseRow> = sqlx::query_as(
            "SELECT uuid, name, description, keywords, created_at, updated_at \
             FROM courses WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Course::from))
    }

    /// List courses, optionally matching a keyword against name, description
    /// and the keyword list.
    pub async fn list(&self, keyword: Option<&str>) -> Result<Vec<Course>, sqlx::Error> {
        let rows: Vec<CourseRow> = match keyword {
            Some(keyword) => {
                let pattern = format!("%{}%", keyword);
                sqlx::query_as(
                    "SELECT uuid, name, description, keywords, created_at, updated_at \
                     FROM courses \
                     WHERE name LIKE ? OR description LIKE ? OR keywords LIKE ? \
                     ORDER BY name ASC",
                )
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT uuid, name, description, keywords, created_at, updated_at \
                     FROM courses ORDER BY name ASC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(Course::from).collect())
    }

    pub async fn update(
        &self,
        uuid: &str,
        name: Option<&str>,
        description: Option<&str>,
        keywords: &Option<Vec<String>>,
    ) -> Result<Option<Course>, sqlx::Error> {
        let Some(current) = self.get(uuid).await? else {
            return Ok(None);
        };

        let name = name.unwrap_or(&current.name);
        let description = description
            .map(str::to_string)
            .or(current.description);
        let keywords_json =
            keywords_to_json(keywords).or_else(|| keywords_to_json(&current.keywords));

        sqlx::query(
            "UPDATE courses SET name = ?, description = ?, keywords = ?, \
             updated_at = datetime('now') WHERE uuid = ?",
        )
        .bind(name)
        .bind(&description)
        .bind(&keywords_json)
        .bind(uuid)
        .execute(&self.pool)
        .await?;

        self.get(uuid).await
    }

    pub async fn delete(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM courses WHERE uuid = ?")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct CourseRecordStore {
    pool: SqlitePool,
}

/// One lesson taken by a student: date, covered content, performance notes.
/// The teacher id is stamped from the authenticated caller.
#[derive(Debug, Clone, Serialize)]
pub struct CourseRecord {
    pub uuid: String,
    pub student_uuid: String,
    pub course_uuid: String,
    pub class_date: String,
    pub content: String,
    pub performance: Option<String>,
    pub teacher_uuid: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct CourseRecordRow {
    uuid: String,
    student_uuid: String,
    course_uuid: String,
    class_date: String,
    content: String,
    performance: Option<String>,
    teacher_uuid: String,
    created_at: String,
    updated_at: String,
}

impl From<CourseRecordRow> for CourseRecord {
    fn from(row: CourseRecordRow) -> Self {
        Self {
            uuid: row.uuid,
            student_uuid: row.student_uuid,
            course_uuid: row.course_uuid,
            class_date: row.class_date,
            content: row.content,
            performance: row.performance,
            teacher_uuid: row.teacher_uuid,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Optional filters for listing course records.
#[derive(Debug, Clone, Default)]
pub struct CourseRecordFilter {
    pub student_uuid: Option<String>,
    pub course_uuid: Option<String>,
}

const RECORD_COLUMNS: &str = "uuid, student_uuid, course_uuid, class_date, content, performance, \
     teacher_uuid, created_at, updated_at";

impl CourseRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        uuid: &str,
        student_uuid: &str,
        course_uuid: &str,
        class_date: &str,
        content: &str,
        performance: Option<&str>,
        teacher_uuid: &str,
    ) -> Result<CourseRecord, sqlx::Error> {
        sqlx::query(
            "INSERT INTO course_records \
             (uuid, student_uuid, course_uuid, class_date, content, performance, teacher_uuid) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(student_uuid)
        .bind(course_uuid)
        .bind(class_date)
        .bind(content)
        .bind(performance)
        .bind(teacher_uuid)
        .execute(&self.pool)
        .await?;
        self.get(uuid).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get(&self, uuid: &str) -> Result<Option<CourseRecord>, sqlx::Error> {
        let row: Option<CourseRecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM course_records WHERE uuid = ?",
            RECORD_COLUMNS
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CourseRecord::from))
    }

    pub async fn list(&self, filter: &CourseRecordFilter) -> Result<Vec<CourseRecord>, sqlx::Error> {
        let mut sql = format!(
            "SELECT {} FROM course_records WHERE 1 = 1",
            RECORD_COLUMNS
        );
        if filter.student_uuid.is_some() {
            sql.push_str(" AND student_uuid = ?");
        }
        if filter.course_uuid.is_some() {
            sql.push_str(" AND course_uuid = ?");
        }
        sql.push_str(" ORDER BY class_date DESC");

        let mut query = sqlx::query_as::<_, CourseRecordRow>(&sql);
        if let Some(student_uuid) = &filter.student_uuid {
            query = query.bind(student_uuid);
        }
        if let Some(course_uuid) = &filter.course_uuid {
            query = query.bind(course_uuid);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(CourseRecord::from).collect())
    }

    pub async fn update(
        &self,
        uuid: &str,
        class_date: Option<&str>,
        content: Option<&str>,
        performance: Option<&str>,
    ) -> Result<Option<CourseRecord>, sqlx::Error> {
        let Some(current) = self.get(uuid).await? else {
            return Ok(None);
        };

        let class_date = class_date.unwrap_or(&current.class_date);
        let content = content.unwrap_or(&current.content);
        let performance = performance.map(str::to_string).or(current.performance);

        sqlx::query(
            "UPDATE course_records SET class_date = ?, content = ?, performance = ?, \
             updated_at = datetime('now') WHERE uuid = ?",
        )
        .bind(class_date)
        .bind(content)
        .bind(&performance)
        .bind(uuid)
        .execute(&self.pool)
        .await?;

        self.get(uuid).await
    }

    pub async fn delete(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM course_records WHERE uuid = ?")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
