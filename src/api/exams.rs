//! Exam paper and exam-record endpoints.

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
use crate::db::{Database, Exam, ExamRecord, ExamRecordFilter};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct ExamsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(ExamsState);

pub fn router(state: ExamsState) -> Router {
    Router::new()
        .route("/", get(list_exams))
        .route("/", post(create_exam))
        .route("/records", get(list_records))
        .route("/records", post(create_record))
        .route("/records/{uuid}", put(update_record))
        .route("/records/{uuid}", delete(delete_record))
        .route("/{uuid}", get(get_exam))
        .route("/{uuid}", put(update_exam))
        .route("/{uuid}", delete(delete_exam))
        .with_state(state)
}

// --- Exams ---

#[derive(Deserialize)]
struct ListExamsQuery {
    keyword: Option<String>,
}

#[derive(Deserialize)]
struct CreateExamRequest {
    title: String,
    description: Option<String>,
    keywords: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct UpdateExamRequest {
    title: Option<String>,
    description: Option<String>,
    keywords: Option<Vec<String>>,
}

async fn list_exams(
    State(state): State<ExamsState>,
    Auth(_): Auth,
    Query(query): Query<ListExamsQuery>,
) -> Result<Json<Vec<Exam>>, ApiError> {
    let exams = state
        .db
        .exams()
        .list(query.keyword.as_deref())
        .await
        .db_err("Failed to list exams")?;
    Ok(Json(exams))
}

async fn create_exam(
    State(state): State<ExamsState>,
    TeacherOnly(_): TeacherOnly,
    Json(payload): Json<CreateExamRequest>,
) -> Result<Json<Exam>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::bad_request("Exam title cannot be empty"));
    }

    let exam = state
        .db
        .exams()
        .create(
            &uuid::Uuid::new_v4().to_string(),
            payload.title.trim(),
            payload.description.as_deref(),
            &payload.keywords,
        )
        .await
        .db_err("Failed to create exam")?;
    Ok(Json(exam))
}

async fn get_exam(
    State(state): State<ExamsState>,
    Auth(_): Auth,
    Path(uuid): Path<String>,
) -> Result<Json<Exam>, ApiError> {
    let exam = state
        .db
        .exams()
        .get(&uuid)
        .await
        .db_err("Failed to load exam")?
        .ok_or_else(|| ApiError::not_found("Exam not found"))?;
    Ok(Json(exam))
}

async fn update_exam(
    State(state): State<ExamsState>,
    TeacherOnly(_): TeacherOnly,
    Path(uuid): Path<String>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<Json<Exam>, ApiError> {
    let exam = state
        .db
        .exams()
        .update(
            &uuid,
            payload.title.as_deref(),
            payload.description.as_deref(),
            &payload.keywords,
        )
        .await
        .db_err("Failed to update exam")?
        .ok_or_else(|| ApiError::not_found("Exam not found"))?;
    Ok(Json(exam))
}

async fn delete_exam(
    State(state): State<ExamsState>,
    TeacherOnly(_): TeacherOnly,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .db
        .exams()
        .delete(&uuid)
        .await
        .db_err("Failed to delete exam")?;
    if !removed {
        return Err(ApiError::not_found("Exam not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- Exam records ---

#[derive(Deserialize)]
struct ListRecordsQuery {
    student_uuid: Option<String>,
    exam_uuid: Option<String>,
}

#[derive(Deserialize)]
struct CreateRecordRequest {
    student_uuid: String,
    exam_uuid: String,
    score: Option<f64>,
    completion_date: String,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct UpdateRecordRequest {
    score: Option<f64>,
    completion_date: Option<String>,
    notes: Option<String>,
}

async fn list_records(
    State(state): State<ExamsState>,
    Auth(user): Auth,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<Vec<ExamRecord>>, ApiError> {
    let student_uuid = if user.is_teacher() {
        query.student_uuid
    } else {
        Some(user.uuid().to_string())
    };

    let records = state
        .db
        .exam_records()
        .list(&ExamRecordFilter {
            student_uuid,
            exam_uuid: query.exam_uuid,
        })
        .await
        .db_err("Failed to list exam records")?;
    Ok(Json(records))
}

async fn create_record(
    State(state): State<ExamsState>,
    TeacherOnly(_): TeacherOnly,
    Json(payload): Json<CreateRecordRequest>,
) -> Result<Json<ExamRecord>, ApiError> {
    let record = state
        .db
        .exam_records()
        .create(
            &uuid::Uuid::new_v4().to_string(),
            &payload.student_uuid,
            &payload.exam_uuid,
            payload.score,
            &payload.completion_date,
            payload.notes.as_deref(),
        )
        .await
        .db_err("Failed to create exam record")?;
    Ok(Json(record))
}

async fn update_record(
    State(state): State<ExamsState>,
    TeacherOnly(_): TeacherOnly,
    Path(uuid): Path<String>,
    Json(payload): Json<UpdateRecordRequest>,
) -> Result<Json<ExamRecord>, ApiError> {
    let record = state
        .db
        .exam_records()
        .update(
            &uuid,
            payload.score,
            payload.completion_date.as_deref(),
            payload.notes.as_deref(),
        )
        .await
        .db_err("Failed to update exam record")?
        .ok_or_else(|| ApiError::not_found("Exam record not found"))?;
    Ok(Json(record))
}

async fn delete_record(
    State(state): State<ExamsState>,
    TeacherOnly(_): TeacherOnly,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .db
        .exam_records()
        .delete(&uuid)
        .await
        .db_err("Failed to delete exam record")?;
    if !removed {
        return Err(ApiError::not_found("Exam record not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
