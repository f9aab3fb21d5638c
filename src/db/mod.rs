mod announcement;
mod course;
mod exam;
mod homework;
mod user;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use announcement::{Announcement, AnnouncementStore};
pub use course::{Course, CourseRecord, CourseRecordFilter, CourseRecordStore, CourseStore};
pub use exam::{Exam, ExamRecord, ExamRecordFilter, ExamRecordStore, ExamStore};
pub use homework::{Homework, HomeworkFilter, HomeworkStore};
pub use user::{NewUser, User, UserRole, UserStore, UserUpdate};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                // Users table. Student profile fields live on the user row.
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    username TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    email TEXT UNIQUE NOT NULL,
                    password_hash TEXT NOT NULL,
                    display_name TEXT,
                    bio TEXT,
                    role TEXT NOT NULL DEFAULT 'student',
                    grade INTEGER,
                    parent_name TEXT,
                    parent_phone TEXT,
                    address TEXT,
                    notes TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE TABLE courses (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    name TEXT NOT NULL,
                    description TEXT,
                    keywords TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE TABLE course_records (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    student_uuid TEXT NOT NULL,
                    course_uuid TEXT NOT NULL,
                    class_date TEXT NOT NULL,
                    content TEXT NOT NULL,
                    performance TEXT,
                    teacher_uuid TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_course_records_student ON course_records(student_uuid)",
                "CREATE INDEX idx_course_records_course ON course_records(course_uuid)",
                "CREATE TABLE homework (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    student_uuid TEXT NOT NULL,
                    title TEXT NOT NULL,
                    description TEXT,
                    submission_date TEXT NOT NULL,
                    grade TEXT,
                    feedback TEXT,
                    teacher_uuid TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_homework_student ON homework(student_uuid)",
                "CREATE TABLE exams (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    title TEXT NOT NULL,
                    description TEXT,
                    keywords TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE TABLE exam_records (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    student_uuid TEXT NOT NULL,
                    exam_uuid TEXT NOT NULL,
                    score REAL,
                    completion_date TEXT NOT NULL,
                    notes TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_exam_records_student ON exam_records(student_uuid)",
                "CREATE INDEX idx_exam_records_exam ON exam_records(exam_uuid)",
                "CREATE TABLE announcements (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    title TEXT NOT NULL,
                    content TEXT NOT NULL,
                    publisher_uuid TEXT NOT NULL,
                    publisher_name TEXT NOT NULL,
                    publisher_role TEXT NOT NULL,
                    is_important INTEGER NOT NULL DEFAULT 0,
                    expires_at TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
            ],
        )
        .await
    }

    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    pub fn courses(&self) -> CourseStore {
        CourseStore::new(self.pool.clone())
    }

    pub fn course_records(&self) -> CourseRecordStore {
        CourseRecordStore::new(self.pool.clone())
    }

    pub fn homework(&self) -> HomeworkStore {
        HomeworkStore::new(self.pool.clone())
    }

    pub fn exams(&self) -> ExamStore {
        ExamStore::new(self.pool.clone())
    }

    pub fn exam_records(&self) -> ExamRecordStore {
        ExamRecordStore::new(self.pool.clone())
    }

    pub fn announcements(&self) -> AnnouncementStore {
        AnnouncementStore::new(self.pool.clone())
    }
}
