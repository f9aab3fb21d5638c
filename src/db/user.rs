use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Teacher,
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "teacher" => UserRole::Teacher,
            _ => UserRole::Student,
        }
    }
}

/// A user account. Student profile fields are populated for student users.
/// Internal ids and the password hash never leave the server.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: i64,
    pub uuid: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub role: UserRole,
    pub grade: Option<i64>,
    pub parent_name: Option<String>,
    pub parent_phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    uuid: String,
    username: String,
    email: String,
    password_hash: String,
    display_name: Option<String>,
    bio: Option<String>,
    role: String,
    grade: Option<i64>,
    parent_name: Option<String>,
    parent_phone: Option<String>,
    address: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            display_name: row.display_name,
            bio: row.bio,
            role: UserRole::from_str(&row.role),
            grade: row.grade,
            parent_name: row.parent_name,
            parent_phone: row.parent_phone,
            address: row.address,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields for creating a user. The password arrives already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub uuid: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub role: UserRole,
    pub grade: Option<i64>,
    pub parent_name: Option<String>,
    pub parent_phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Partial update for a user. `None` fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<String>,
    pub grade: Option<i64>,
    pub parent_name: Option<String>,
    pub parent_phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

const SELECT_COLUMNS: &str = "id, uuid, username, email, password_hash, display_name, bio, role, \
     grade, parent_name, parent_phone, address, notes, created_at, updated_at";

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new user and return it.
    pub async fn create(&self, new: NewUser) -> Result<User, sqlx::Error> {
        sqlx::query(
            "INSERT INTO users (uuid, username, email, password_hash, display_name, bio, role, \
             grade, parent_name, parent_phone, address, notes) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new.uuid)
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.display_name)
        .bind(&new.bio)
        .bind(new.role.as_str())
        .bind(new.grade)
        .bind(&new.parent_name)
        .bind(&new.parent_phone)
        .bind(&new.address)
        .bind(&new.notes)
        .execute(&self.pool)
        .await?;

        let row: UserRow =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE uuid = ?", SELECT_COLUMNS))
                .bind(&new.uuid)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.into())
    }

    /// Get a user by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE uuid = ?", SELECT_COLUMNS))
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Look up an account by username or email in a single query.
    pub async fn get_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE username = ? OR email = ?",
            SELECT_COLUMNS
        ))
        .bind(username_or_email)
        .bind(username_or_email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// List student accounts, optionally filtered by grade.
    pub async fn list_students(&self, grade: Option<i64>) -> Result<Vec<User>, sqlx::Error> {
        let rows: Vec<UserRow> = match grade {
            Some(grade) => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM users WHERE role = 'student' AND grade = ? ORDER BY username ASC",
                    SELECT_COLUMNS
                ))
                .bind(grade)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM users WHERE role = 'student' ORDER BY username ASC",
                    SELECT_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Apply a partial update to a user and return the updated row.
    /// Missing fields keep their current values.
    pub async fn update(&self, uuid: &str, update: UserUpdate) -> Result<Option<User>, sqlx::Error> {
        let Some(current) = self.get_by_uuid(uuid).await? else {
            return Ok(None);
        };

        let email = update.email.unwrap_or(current.email);
        let display_name = update.display_name.or(current.display_name);
        let bio = update.bio.or(current.bio);
        let role = update
            .role
            .map(|r| UserRole::from_str(&r))
            .unwrap_or(current.role);
        let grade = update.grade.or(current.grade);
        let parent_name = update.parent_name.or(current.parent_name);
        let parent_phone = update.parent_phone.or(current.parent_phone);
        let address = update.address.or(current.address);
        let notes = update.notes.or(current.notes);

        sqlx::query(
            "UPDATE users SET email = ?, display_name = ?, bio = ?, role = ?, grade = ?, \
             parent_name = ?, parent_phone = ?, address = ?, notes = ?, \
             updated_at = datetime('now') WHERE uuid = ?",
        )
        .bind(&email)
        .bind(&display_name)
        .bind(&bio)
        .bind(role.as_str())
        .bind(grade)
        .bind(&parent_name)
        .bind(&parent_phone)
        .bind(&address)
        .bind(&notes)
        .bind(uuid)
        .execute(&self.pool)
        .await?;

        self.get_by_uuid(uuid).await
    }

    /// Delete a user. Returns true if a row was removed.
    pub async fn delete(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE uuid = ?")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
