mod announcements;
mod courses;
mod error;
mod exams;
mod homework;
mod session;
mod students;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, ErrorType, ResultExt};

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    rate_limits: Arc<RateLimitConfig>,
) -> Router {
    let users_state = users::UsersState {
        db: db.clone(),
        jwt: jwt.clone(),
        rate_limits,
    };

    let session_state = session::SessionState { jwt: jwt.clone() };

    let students_state = students::StudentsState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let courses_state = courses::CoursesState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let homework_state = homework::HomeworkState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let exams_state = exams::ExamsState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let announcements_state = announcements::AnnouncementsState { db, jwt };

    Router::new()
        .nest("/users", users::router(users_state))
        .nest("/auth", session::router(session_state))
        .nest("/students", students::router(students_state))
        .nest("/courses", courses::router(courses_state))
        .nest("/homework", homework::router(homework_state))
        .nest("/exams", exams::router(exams_state))
        .nest("/announcements", announcements::router(announcements_state))
}
