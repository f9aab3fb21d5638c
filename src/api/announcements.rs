//! Announcement endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{Auth, TeacherOnly};
use crate::db::{Announcement, Database};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

/// How many announcements a listing returns.
const LIST_LIMIT: i64 = 20;

#[derive(Clone)]
pub struct AnnouncementsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(AnnouncementsState);

pub fn router(state: AnnouncementsState) -> Router {
    Router::new()
        .route("/", get(list_announcements))
        .route("/", post(create_announcement))
        .route("/{uuid}", put(update_announcement))
        .route("/{uuid}", delete(delete_announcement))
        .with_state(state)
}

#[derive(Deserialize)]
struct CreateRequest {
    title: String,
    content: String,
    #[serde(default)]
    is_important: bool,
    expires_at: Option<String>,
}

#[derive(Deserialize)]
struct UpdateRequest {
    title: Option<String>,
    content: Option<String>,
    is_important: Option<bool>,
    expires_at: Option<String>,
}

async fn list_announcements(
    State(state): State<AnnouncementsState>,
    Auth(_): Auth,
) -> Result<Json<Vec<Announcement>>, ApiError> {
    let announcements = state
        .db
        .announcements()
        .list(LIST_LIMIT)
        .await
        .db_err("Failed to list announcements")?;
    Ok(Json(announcements))
}

async fn create_announcement(
    State(state): State<AnnouncementsState>,
    TeacherOnly(teacher): TeacherOnly,
    Json(payload): Json<CreateRequest>,
) -> Result<Json<Announcement>, ApiError> {
    if payload.title.trim().is_empty() || payload.content.trim().is_empty() {
        return Err(ApiError::bad_request("Title and content are required"));
    }

    let announcement = state
        .db
        .announcements()
        .create(
            &uuid::Uuid::new_v4().to_string(),
            payload.title.trim(),
            payload.content.trim(),
            teacher.uuid(),
            &teacher.claims.username,
            teacher.role().as_str(),
            payload.is_important,
            payload.expires_at.as_deref(),
        )
        .await
        .db_err("Failed to create announcement")?;
    Ok(Json(announcement))
}

async fn update_announcement(
    State(state): State<AnnouncementsState>,
    TeacherOnly(_): TeacherOnly,
    Path(uuid): Path<String>,
    Json(payload): Json<UpdateRequest>,
) -> Result<Json<Announcement>, ApiError> {
    let announcement = state
        .db
        .announcements()
        .update(
            &uuid,
            payload.title.as_deref(),
            payload.content.as_deref(),
            payload.is_important,
            payload.expires_at.as_deref(),
        )
        .await
        .db_err("Failed to update announcement")?
        .ok_or_else(|| ApiError::not_found("Announcement not found"))?;
    Ok(Json(announcement))
}

async fn delete_announcement(
    State(state): State<AnnouncementsState>,
    TeacherOnly(_): TeacherOnly,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .db
        .announcements()
        .delete(&uuid)
        .await
        .db_err("Failed to delete announcement")?;
    if !removed {
        return Err(ApiError::not_found("Announcement not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
