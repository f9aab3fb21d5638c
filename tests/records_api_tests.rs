//! Role enforcement and CRUD behavior for the record-keeping endpoints.

mod common;

use axum::Router;
use axum::http::StatusCode;
use common::{error_type, login, register_user, send_json, test_app};
use serde_json::json;

/// Register and log in a teacher and a student.
/// Returns (teacher_token, teacher_uuid, student_token, student_uuid).
async fn seed_accounts(app: &Router) -> (String, String, String, String) {
    let teacher = register_user(app, "teach", "teach@example.com", "secret123", "teacher").await;
    let student = register_user(app, "stud", "stud@example.com", "secret123", "student").await;
    let (teacher_token, _) = login(app, "teach", "secret123").await;
    let (student_token, _) = login(app, "stud", "secret123").await;
    (
        teacher_token,
        teacher["uuid"].as_str().unwrap().to_string(),
        student_token,
        student["uuid"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_course_crud_and_role_enforcement() {
    let (app, _db) = test_app().await;
    let (teacher_token, _, student_token, _) = seed_accounts(&app).await;

    // Students cannot create courses
    let (status, body) = send_json(
        &app,
        "POST",
        "/courses",
        Some(&student_token),
        Some(json!({"name": "Algebra"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_type(&body), "Forbidden");

    // Teachers can
    let (status, course) = send_json(
        &app,
        "POST",
        "/courses",
        Some(&teacher_token),
        Some(json!({
            "name": "Algebra",
            "description": "Linear equations",
            "keywords": ["math", "equations"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let course_uuid = course["uuid"].as_str().unwrap().to_string();
    assert_eq!(course["keywords"], json!(["math", "equations"]));

    // Students can browse
    let (status, listed) = send_json(
        &app,
        "GET",
        "/courses?keyword=Algebra",
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Update and delete are teacher operations
    let (status, updated) = send_json(
        &app,
        "PUT",
        &format!("/courses/{}", course_uuid),
        Some(&teacher_token),
        Some(json!({"description": "Linear and quadratic equations"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "Linear and quadratic equations");
    assert_eq!(updated["name"], "Algebra");

    let (status, _) = send_json(
        &app,
        "DELETE",
        &format!("/courses/{}", course_uuid),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_json(
        &app,
        "DELETE",
        &format!("/courses/{}", course_uuid),
        Some(&teacher_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send_json(
        &app,
        "GET",
        &format!("/courses/{}", course_uuid),
        Some(&teacher_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_course_records_stamp_teacher_and_filter_students() {
    let (app, _db) = test_app().await;
    let (teacher_token, teacher_uuid, student_token, student_uuid) = seed_accounts(&app).await;
    let other =
        register_user(&app, "other", "other@example.com", "secret123", "student").await;
    let other_uuid = other["uuid"].as_str().unwrap();

    let (_, course) = send_json(
        &app,
        "POST",
        "/courses",
        Some(&teacher_token),
        Some(json!({"name": "History"})),
    )
    .await;
    let course_uuid = course["uuid"].as_str().unwrap();

    // One record per student; the teacher id comes from the token, not the body
    for student in [&student_uuid, &other_uuid.to_string()] {
        let (status, record) = send_json(
            &app,
            "POST",
            "/courses/records",
            Some(&teacher_token),
            Some(json!({
                "student_uuid": student,
                "course_uuid": course_uuid,
                "class_date": "2026-03-02",
                "content": "French revolution",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["teacher_uuid"], teacher_uuid.as_str());
    }

    // The teacher sees both records
    let (_, all) = send_json(&app, "GET", "/courses/records", Some(&teacher_token), None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    // A student sees only their own, even when asking for someone else's
    let (_, own) = send_json(
        &app,
        "GET",
        &format!("/courses/records?student_uuid={}", other_uuid),
        Some(&student_token),
        None,
    )
    .await;
    let own = own.as_array().unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0]["student_uuid"], student_uuid.as_str());

    // Students cannot write records
    let (status, _) = send_json(
        &app,
        "POST",
        "/courses/records",
        Some(&student_token),
        Some(json!({
            "student_uuid": student_uuid,
            "course_uuid": course_uuid,
            "class_date": "2026-03-09",
            "content": "Self-recorded lesson",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_homework_grading_flow() {
    let (app, _db) = test_app().await;
    let (teacher_token, _, student_token, student_uuid) = seed_accounts(&app).await;

    let (status, homework) = send_json(
        &app,
        "POST",
        "/homework",
        Some(&teacher_token),
        Some(json!({
            "student_uuid": student_uuid,
            "title": "Essay on photosynthesis",
            "submission_date": "2026-03-10",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let homework_uuid = homework["uuid"].as_str().unwrap();
    assert!(homework["grade"].is_null());

    // The student sees their own homework
    let (status, own) = send_json(&app, "GET", "/homework", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own.as_array().unwrap().len(), 1);

    // Grading requires a grade or feedback
    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/homework/{}/grade", homework_uuid),
        Some(&teacher_token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Students cannot grade
    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/homework/{}/grade", homework_uuid),
        Some(&student_token),
        Some(json!({"grade": "A+"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, graded) = send_json(
        &app,
        "POST",
        &format!("/homework/{}/grade", homework_uuid),
        Some(&teacher_token),
        Some(json!({"grade": "A", "feedback": "Well argued"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graded["grade"], "A");
    assert_eq!(graded["feedback"], "Well argued");
}

#[tokio::test]
async fn test_students_listing_and_self_access() {
    let (app, _db) = test_app().await;
    let (teacher_token, _, student_token, student_uuid) = seed_accounts(&app).await;

    // Listing students is teacher-only
    let (status, _) = send_json(&app, "GET", "/students", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, students) = send_json(&app, "GET", "/students", Some(&teacher_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(students.as_array().unwrap().len(), 1);

    // A student reads and updates their own profile
    let (status, me) = send_json(
        &app,
        "GET",
        &format!("/students/{}", student_uuid),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "stud");

    let (status, updated) = send_json(
        &app,
        "PUT",
        &format!("/students/{}", student_uuid),
        Some(&student_token),
        Some(json!({"grade": 9, "parent_name": "P. Stud", "role": "teacher"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["grade"], 9);
    // The attempted role escalation is ignored
    assert_eq!(updated["role"], "student");

    // Grade filter
    let (_, ninth_graders) = send_json(
        &app,
        "GET",
        "/students?grade=9",
        Some(&teacher_token),
        None,
    )
    .await;
    assert_eq!(ninth_graders.as_array().unwrap().len(), 1);
    let (_, tenth_graders) = send_json(
        &app,
        "GET",
        "/students?grade=10",
        Some(&teacher_token),
        None,
    )
    .await;
    assert_eq!(tenth_graders.as_array().unwrap().len(), 0);

    // A student cannot read another student's profile
    let other = register_user(&app, "other", "other@example.com", "secret123", "student").await;
    let (status, _) = send_json(
        &app,
        "GET",
        &format!("/students/{}", other["uuid"].as_str().unwrap()),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_exam_records_visibility() {
    let (app, _db) = test_app().await;
    let (teacher_token, _, student_token, student_uuid) = seed_accounts(&app).await;

    let (_, exam) = send_json(
        &app,
        "POST",
        "/exams",
        Some(&teacher_token),
        Some(json!({"title": "Midterm", "keywords": ["biology"]})),
    )
    .await;
    let exam_uuid = exam["uuid"].as_str().unwrap();

    let (status, record) = send_json(
        &app,
        "POST",
        "/exams/records",
        Some(&teacher_token),
        Some(json!({
            "student_uuid": student_uuid,
            "exam_uuid": exam_uuid,
            "score": 87.5,
            "completion_date": "2026-04-01",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["score"], 87.5);

    // The student sees their result
    let (_, own) = send_json(&app, "GET", "/exams/records", Some(&student_token), None).await;
    assert_eq!(own.as_array().unwrap().len(), 1);

    // Keyword search on exams
    let (_, found) = send_json(
        &app,
        "GET",
        "/exams?keyword=biology",
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(found.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_announcements_stamp_publisher() {
    let (app, _db) = test_app().await;
    let (teacher_token, teacher_uuid, student_token, _) = seed_accounts(&app).await;

    // Students cannot publish
    let (status, _) = send_json(
        &app,
        "POST",
        "/announcements",
        Some(&student_token),
        Some(json!({"title": "Hi", "content": "Hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send_json(
        &app,
        "POST",
        "/announcements",
        Some(&teacher_token),
        Some(json!({
            "title": "Exam week",
            "content": "Midterms start Monday",
            "is_important": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Publisher fields come from the verified token
    assert_eq!(created["publisher_uuid"], teacher_uuid.as_str());
    assert_eq!(created["publisher_name"], "teach");
    assert_eq!(created["publisher_role"], "teacher");

    let (status, listed) = send_json(&app, "GET", "/announcements", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["is_important"], true);

    let uuid = listed[0]["uuid"].as_str().unwrap();
    let (status, _) = send_json(
        &app,
        "DELETE",
        &format!("/announcements/{}", uuid),
        Some(&teacher_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
