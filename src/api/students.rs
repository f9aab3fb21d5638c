//! Student profile endpoints.
//!
//! Students are user accounts with the student role; teachers see every
//! student, a student sees and edits only their own profile.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{Auth, TeacherOnly};
use crate::db::{Database, User, UserRole, UserUpdate};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct StudentsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(StudentsState);

pub fn router(state: StudentsState) -> Router {
    Router::new()
        .route("/", get(list_students))
        .route("/{uuid}", get(get_student))
        .route("/{uuid}", put(update_student))
        .route("/{uuid}", delete(delete_student))
        .with_state(state)
}

#[derive(Deserialize)]
struct ListQuery {
    grade: Option<i64>,
}

async fn list_students(
    State(state): State<StudentsState>,
    TeacherOnly(_): TeacherOnly,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let students = state
        .db
        .users()
        .list_students(query.grade)
        .await
        .db_err("Failed to list students")?;
    Ok(Json(students))
}

async fn get_student(
    State(state): State<StudentsState>,
    Auth(user): Auth,
    Path(uuid): Path<String>,
) -> Result<Json<User>, ApiError> {
    if !user.is_teacher() && user.uuid() != uuid {
        return Err(ApiError::forbidden("Students can only view their own profile"));
    }

    let student = state
        .db
        .users()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to load student")?
        .filter(|u| u.role == UserRole::Student)
        .ok_or_else(|| ApiError::not_found("Student not found"))?;
    Ok(Json(student))
}

async fn update_student(
    State(state): State<StudentsState>,
    Auth(user): Auth,
    Path(uuid): Path<String>,
    Json(mut update): Json<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    if !user.is_teacher() {
        if user.uuid() != uuid {
            return Err(ApiError::forbidden(
                "Students can only update their own profile",
            ));
        }
        // Role changes are a teacher-only operation.
        update.role = None;
    }

    let updated = state
        .db
        .users()
        .update(&uuid, update)
        .await
        .db_err("Failed to update student")?
        .ok_or_else(|| ApiError::not_found("Student not found"))?;
    Ok(Json(updated))
}

async fn delete_student(
    State(state): State<StudentsState>,
    TeacherOnly(_): TeacherOnly,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .db
        .users()
        .delete(&uuid)
        .await
        .db_err("Failed to delete student")?;
    if !removed {
        return Err(ApiError::not_found("Student not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
