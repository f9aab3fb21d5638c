//! Homework endpoints, including teacher grading.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{Auth, TeacherOnly};
use crate::db::{Database, Homework, HomeworkFilter};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct HomeworkState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(HomeworkState);

pub fn router(state: HomeworkState) -> Router {
    Router::new()
        .route("/", get(list_homework))
        .route("/", post(create_homework))
        .route("/{uuid}", get(get_homework))
        .route("/{uuid}", put(update_homework))
        .route("/{uuid}", delete(delete_homework))
        .route("/{uuid}/grade", post(grade_homework))
        .with_state(state)
}

#[derive(Deserialize)]
struct ListQuery {
    student_uuid: Option<String>,
    teacher_uuid: Option<String>,
}

#[derive(Deserialize)]
struct CreateHomeworkRequest {
    student_uuid: String,
    title: String,
    description: Option<String>,
    submission_date: String,
}

#[derive(Deserialize)]
struct UpdateHomeworkRequest {
    title: Option<String>,
    description: Option<String>,
    submission_date: Option<String>,
}

#[derive(Deserialize)]
struct GradeRequest {
    grade: Option<String>,
    feedback: Option<String>,
}

async fn list_homework(
    State(state): State<HomeworkState>,
    Auth(user): Auth,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Homework>>, ApiError> {
    let filter = if user.is_teacher() {
        HomeworkFilter {
            student_uuid: query.student_uuid,
            teacher_uuid: query.teacher_uuid,
        }
    } else {
        // Students see only their own homework.
        HomeworkFilter {
            student_uuid: Some(user.uuid().to_string()),
            teacher_uuid: None,
        }
    };

    let homework = state
        .db
        .homework()
        .list(&filter)
        .await
        .db_err("Failed to list homework")?;
    Ok(Json(homework))
}

async fn create_homework(
    State(state): State<HomeworkState>,
    TeacherOnly(teacher): TeacherOnly,
    Json(payload): Json<CreateHomeworkRequest>,
) -> Result<Json<Homework>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::bad_request("Homework title cannot be empty"));
    }

    let homework = state
        .db
        .homework()
        .create(
            &uuid::Uuid::new_v4().to_string(),
            &payload.student_uuid,
            payload.title.trim(),
            payload.description.as_deref(),
            &payload.submission_date,
            Some(teacher.uuid()),
        )
        .await
        .db_err("Failed to create homework")?;
    Ok(Json(homework))
}

async fn get_homework(
    State(state): State<HomeworkState>,
    Auth(user): Auth,
    Path(uuid): Path<String>,
) -> Result<Json<Homework>, ApiError> {
    let homework = state
        .db
        .homework()
        .get(&uuid)
        .await
        .db_err("Failed to load homework")?
        .ok_or_else(|| ApiError::not_found("Homework not found"))?;

    if !user.is_teacher() && homework.student_uuid != user.uuid() {
        return Err(ApiError::forbidden("Students can only view their own homework"));
    }
    Ok(Json(homework))
}

async fn update_homework(
    State(state): State<HomeworkState>,
    TeacherOnly(_): TeacherOnly,
    Path(uuid): Path<String>,
    Json(payload): Json<UpdateHomeworkRequest>,
) -> Result<Json<Homework>, ApiError> {
    let homework = state
        .db
        .homework()
        .update(
            &uuid,
            payload.title.as_deref(),
            payload.description.as_deref(),
            payload.submission_date.as_deref(),
        )
        .await
        .db_err("Failed to update homework")?
        .ok_or_else(|| ApiError::not_found("Homework not found"))?;
    Ok(Json(homework))
}

async fn grade_homework(
    State(state): State<HomeworkState>,
    TeacherOnly(teacher): TeacherOnly,
    Path(uuid): Path<String>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<Homework>, ApiError> {
    if payload.grade.is_none() && payload.feedback.is_none() {
        return Err(ApiError::bad_request("A grade or feedback is required"));
    }

    let homework = state
        .db
        .homework()
        .grade(
            &uuid,
            payload.grade.as_deref(),
            payload.feedback.as_deref(),
            teacher.uuid(),
        )
        .await
        .db_err("Failed to grade homework")?
        .ok_or_else(|| ApiError::not_found("Homework not found"))?;
    Ok(Json(homework))
}

async fn delete_homework(
    State(state): State<HomeworkState>,
    TeacherOnly(_): TeacherOnly,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .db
        .homework()
        .delete(&uuid)
        .await
        .db_err("Failed to delete homework")?;
    if !removed {
        return Err(ApiError::not_found("Homework not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
