//! Homework storage.

use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct HomeworkStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Homework {
    pub uuid: String,
    pub student_uuid: String,
    pub title: String,
    pub description: Option<String>,
    pub submission_date: String,
    pub grade: Option<String>,
    pub feedback: Option<String>,
    pub teacher_uuid: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct HomeworkRow {
    uuid: String,
    student_uuid: String,
    title: String,
    description: Option<String>,
    submission_date: String,
    grade: Option<String>,
    feedback: Option<String>,
    teacher_uuid: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<HomeworkRow> for Homework {
    fn from(row: HomeworkRow) -> Self {
        Self {
            uuid: row.uuid,
            student_uuid: row.student_uuid,
            title: row.title,
            description: row.description,
            submission_date: row.submission_date,
            grade: row.grade,
            feedback: row.feedback,
            teacher_uuid: row.teacher_uuid,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Optional filters for listing homework.
#[derive(Debug, Clone, Default)]
pub struct HomeworkFilter {
    pub student_uuid: Option<String>,
    pub teacher_uuid: Option<String>,
}

const COLUMNS: &str = "uuid, student_uuid, title, description, submission_date, grade, feedback, \
     teacher_uuid, created_at, updated_at";

impl HomeworkStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        uuid: &str,
        student_uuid: &str,
        title: &str,
        description: Option<&str>,
        submission_date: &str,
        teacher_uuid: Option<&str>,
    ) -> Result<Homework, sqlx::Error> {
        sqlx::query(
            "INSERT INTO homework \
             (uuid, student_uuid, title, description, submission_date, teacher_uuid) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(student_uuid)
        .bind(title)
        .bind(description)
        .bind(submission_date)
        .bind(teacher_uuid)
        .execute(&self.pool)
        .await?;
        self.get(uuid).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get(&self, uuid: &str) -> Result<Option<Homework>, sqlx::Error> {
        let row: Option<HomeworkRow> =
            sqlx::query_as(&format!("SELECT {} FROM homework WHERE uuid = ?", COLUMNS))
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Homework::from))
    }

    pub async fn list(&self, filter: &HomeworkFilter) -> Result<Vec<Homework>, sqlx::Error> {
        let mut sql = format!("SELECT {} FROM homework WHERE 1 = 1", COLUMNS);
        if filter.student_uuid.is_some() {
            sql.push_str(" AND student_uuid = ?");
        }
        if filter.teacher_uuid.is_some() {
            sql.push_str(" AND teacher_uuid = ?");
        }
        sql.push_str(" ORDER BY submission_date DESC");

        let mut query = sqlx::query_as::<_, HomeworkRow>(&sql);
        if let Some(student_uuid) = &filter.student_uuid {
            query = query.bind(student_uuid);
        }
        if let Some(teacher_uuid) = &filter.teacher_uuid {
            query = query.bind(teacher_uuid);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Homework::from).collect())
    }

    pub async fn update(
        &self,
        uuid: &str,
        title: Option<&str>,
        description: Option<&str>,
        submission_date: Option<&str>,
    ) -> Result<Option<Homework>, sqlx::Error> {
        let Some(current) = self.get(uuid).await? else {
            return Ok(None);
        };

        let title = title.unwrap_or(&current.title);
        let description = description.map(str::to_string).or(current.description);
        let submission_date = submission_date.unwrap_or(&current.submission_date);

        sqlx::query(
            "UPDATE homework SET title = ?, description = ?, submission_date = ?, \
             updated_at = datetime('now') WHERE uuid = ?",
        )
        .bind(title)
        .bind(&description)
        .bind(submission_date)
        .bind(uuid)
        .execute(&self.pool)
        .await?;

        self.get(uuid).await
    }

    /// Record a grade and/or feedback, stamping the grading teacher.
    pub async fn grade(
        &self,
        uuid: &str,
        grade: Option<&str>,
        feedback: Option<&str>,
        teacher_uuid: &str,
    ) -> Result<Option<Homework>, sqlx::Error> {
        let Some(current) = self.get(uuid).await? else {
            return Ok(None);
        };

        let grade = grade.map(str::to_string).or(current.grade);
        let feedback = feedback.map(str::to_string).or(current.feedback);

        sqlx::query(
            "UPDATE homework SET grade = ?, feedback = ?, teacher_uuid = ?, \
             updated_at = datetime('now') WHERE uuid = ?",
        )
        .bind(&grade)
        .bind(&feedback)
        .bind(teacher_uuid)
        .bind(uuid)
        .execute(&self.pool)
        .await?;

        self.get(uuid).await
    }

    pub async fn delete(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM homework WHERE uuid = ?")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
