//! Course and course-record endpoints.

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
use crate::db::{Course, CourseRecord, CourseRecordFilter, Database};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct CoursesState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(CoursesState);

pub fn router(state: CoursesState) -> Router {
    Router::new()
        .route("/", get(list_courses))
        .route("/", post(create_course))
        .route("/records", get(list_records))
        .route("/records", post(create_record))
        .route("/records/{uuid}", put(update_record))
        .route("/records/{uuid}", delete(delete_record))
        .route("/{uuid}", get(get_course))
        .route("/{uuid}", put(update_course))
        .route("/{uuid}", delete(delete_course))
        .with_state(state)
}

// --- Courses ---

#[derive(Deserialize)]
struct ListCoursesQuery {
    keyword: Option<String>,
}

#[derive(Deserialize)]
struct CreateCourseRequest {
    name: String,
    description: Option<String>,
    keywords: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct UpdateCourseRequest {
    name: Option<String>,
    description: Option<String>,
    keywords: Option<Vec<String>>,
}

async fn list_courses(
    State(state): State<CoursesState>,
    Auth(_): Auth,
    Query(query): Query<ListCoursesQuery>,
) -> Result<Json<Vec<Course>>, ApiError> {
    let courses = state
        .db
        .courses()
        .list(query.keyword.as_deref())
        .await
        .db_err("Failed to list courses")?;
    Ok(Json(courses))
}

async fn create_course(
    State(state): State<CoursesState>,
    TeacherOnly(_): TeacherOnly,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<Json<Course>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("Course name cannot be empty"));
    }

    let course = state
        .db
        .courses()
        .create(
            &uuid::Uuid::new_v4().to_string(),
            payload.name.trim(),
            payload.description.as_deref(),
            &payload.keywords,
        )
        .await
        .db_err("Failed to create course")?;
    Ok(Json(course))
}

async fn get_course(
    State(state): State<CoursesState>,
    Auth(_): Auth,
    Path(uuid): Path<String>,
) -> Result<Json<Course>, ApiError> {
    let course = state
        .db
        .courses()
        .get(&uuid)
        .await
        .db_err("Failed to load course")?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    Ok(Json(course))
}

async fn update_course(
    State(state): State<CoursesState>,
    TeacherOnly(_): TeacherOnly,
    Path(uuid): Path<String>,
    Json(payload): Json<UpdateCourseRequest>,
) -> Result<Json<Course>, ApiError> {
    let course = state
        .db
        .courses()
        .update(
            &uuid,
            payload.name.as_deref(),
            payload.description.as_deref(),
            &payload.keywords,
        )
        .await
        .db_err("Failed to update course")?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    Ok(Json(course))
}

async fn delete_course(
    State(state): State<CoursesState>,
    TeacherOnly(_): TeacherOnly,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .db
        .courses()
        .delete(&uuid)
        .await
        .db_err("Failed to delete course")?;
    if !removed {
        return Err(ApiError::not_found("Course not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- Course records ---

#[derive(Deserialize)]
struct ListRecordsQuery {
    student_uuid: Option<String>,
    course_uuid: Option<String>,
}

#[derive(Deserialize)]
struct CreateRecordRequest {
    student_uuid: String,
    course_uuid: String,
    class_date: String,
    content: String,
    performance: Option<String>,
}

#[derive(Deserialize)]
struct UpdateRecordRequest {
    class_date: Option<String>,
    content: Option<String>,
    performance: Option<String>,
}

async fn list_records(
    State(state): State<CoursesState>,
    Auth(user): Auth,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<Vec<CourseRecord>>, ApiError> {
    // Students only ever see their own records, whatever the query says.
    let student_uuid = if user.is_teacher() {
        query.student_uuid
    } else {
        Some(user.uuid().to_string())
    };

    let records = state
        .db
        .course_records()
        .list(&CourseRecordFilter {
            student_uuid,
            course_uuid: query.course_uuid,
        })
        .await
        .db_err("Failed to list course records")?;
    Ok(Json(records))
}

async fn create_record(
    State(state): State<CoursesState>,
    TeacherOnly(teacher): TeacherOnly,
    Json(payload): Json<CreateRecordRequest>,
) -> Result<Json<CourseRecord>, ApiError> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::bad_request("Lesson content cannot be empty"));
    }

    let record = state
        .db
        .course_records()
        .create(
            &uuid::Uuid::new_v4().to_string(),
            &payload.student_uuid,
            &payload.course_uuid,
            &payload.class_date,
            payload.content.trim(),
            payload.performance.as_deref(),
            teacher.uuid(),
        )
        .await
        .db_err("Failed to create course record")?;
    Ok(Json(record))
}

async fn update_record(
    State(state): State<CoursesState>,
    TeacherOnly(_): TeacherOnly,
    Path(uuid): Path<String>,
    Json(payload): Json<UpdateRecordRequest>,
) -> Result<Json<CourseRecord>, ApiError> {
    let record = state
        .db
        .course_records()
        .update(
            &uuid,
            payload.class_date.as_deref(),
            payload.content.as_deref(),
            payload.performance.as_deref(),
        )
        .await
        .db_err("Failed to update course record")?
        .ok_or_else(|| ApiError::not_found("Course record not found"))?;
    Ok(Json(record))
}

async fn delete_record(
    State(state): State<CoursesState>,
    TeacherOnly(_): TeacherOnly,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .db
        .course_records()
        .delete(&uuid)
        .await
        .db_err("Failed to delete course record")?;
    if !removed {
        return Err(ApiError::not_found("Course record not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
