use axum::http::StatusCode;
use serde_json::json;

mod common;

use common::{create_app_with, create_test_app, question, send};

#[tokio::test]
async fn test_invalid_mode_returns_400_and_creates_nothing() {
    let app = create_test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions",
        Some(json!({ "user_id": "student-1", "mode": "invalid_mode" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("invalid_mode"));

    let (status, body) = send(&app, "GET", "/api/v1/users/student-1/competencies", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["competencies"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_single_question_flow_ends_with_no_more_questions() {
    let app = create_app_with(vec![question("only", "1.1", 1)]).await;

    let (status, started) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions",
        Some(json!({ "user_id": "fresh-user", "mode": "balanced" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(started["status"], "active");
    assert_eq!(started["question"]["id"], "only");
    assert_eq!(started["context"]["reason"], "getting_started");
    // correctness flags never reach the client
    assert!(started["question"]["answers"][0].get("correct").is_none());

    let session_id = started["session_id"].as_str().unwrap().to_string();

    let (status, answered) = send(
        &app,
        "POST",
        &format!("/api/v1/practice/sessions/{}/answers", session_id),
        Some(json!({ "question_id": "only", "selected_answer": 1, "time_spent_ms": 12000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answered["correct"], true);
    assert_eq!(answered["competency_update"]["total_attempts"], 1);

    let (status, next) = send(
        &app,
        "POST",
        &format!("/api/v1/practice/sessions/{}/next", session_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(next["finished"], true);
    assert!(next["question"].is_null());
    assert!(next["message"].as_str().unwrap().contains("No more questions"));

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/v1/practice/sessions/{}", session_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_answer_returns_full_explanation() {
    let app = create_app_with(vec![question("loop-1", "2.1", 2)]).await;

    let (_, started) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions",
        Some(json!({ "user_id": "u-expl", "mode": "competition" })),
    )
    .await;
    let session_id = started["session_id"].as_str().unwrap();

    let (status, answered) = send(
        &app,
        "POST",
        &format!("/api/v1/practice/sessions/{}/answers", session_id),
        Some(json!({ "question_id": "loop-1", "selected_answer": 0, "time_spent_ms": 9000, "hints_used": 1 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(answered["result"], "incorrect");
    assert_eq!(answered["correct_answer"], 1);
    let explanation = &answered["explanation"];
    assert_eq!(explanation["your_answer"]["text"], "1");
    assert_eq!(
        explanation["your_answer"]["common_mistake"],
        "Stopping after the first iteration"
    );
    assert_eq!(explanation["correct_answer"]["text"], "2");
    assert_eq!(
        explanation["correct_answer"]["teaching_point"],
        "range stops before its bound"
    );
    assert_eq!(explanation["lesson_link"], "/lessons/2.1");
    assert_eq!(answered["competency_update"]["mastery_level"], "novice");
    assert_eq!(answered["competency_update"]["new_accuracy"], 0.0);
}

#[tokio::test]
async fn test_submit_error_statuses() {
    let app = create_test_app().await;

    let (_, started) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions",
        Some(json!({ "user_id": "u-errors", "mode": "review" })),
    )
    .await;
    let session_id = started["session_id"].as_str().unwrap();
    let served = started["question"]["id"].as_str().unwrap().to_string();
    let answers_uri = format!("/api/v1/practice/sessions/{}/answers", session_id);

    let (status, body) = send(
        &app,
        "POST",
        &answers_uri,
        Some(json!({ "question_id": "does-not-exist", "selected_answer": 0, "time_spent_ms": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);

    let unserved = if served == "q-1.1-1" { "q-1.1-2" } else { "q-1.1-1" };
    let (status, _) = send(
        &app,
        "POST",
        &answers_uri,
        Some(json!({ "question_id": unserved, "selected_answer": 0, "time_spent_ms": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        &answers_uri,
        Some(json!({ "question_id": served, "selected_answer": 17, "time_spent_ms": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions/missing-session/answers",
        Some(json!({ "question_id": served, "selected_answer": 0, "time_spent_ms": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_answering_same_question_twice_is_rejected() {
    let app = create_app_with(vec![question("once", "1.1", 1)]).await;

    let (_, started) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions",
        Some(json!({ "user_id": "u-replay" })),
    )
    .await;
    let answers_uri = format!(
        "/api/v1/practice/sessions/{}/answers",
        started["session_id"].as_str().unwrap()
    );
    let answer = json!({ "question_id": "once", "selected_answer": 1, "time_spent_ms": 3000 });

    let (status, _) = send(&app, "POST", &answers_uri, Some(answer.clone())).await;
    assert_eq!(status, StatusCode::OK);

    for _ in 0..3 {
        let (status, body) = send(&app, "POST", &answers_uri, Some(answer.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("already answered"));
    }

    let (_, body) = send(&app, "GET", "/api/v1/users/u-replay/competencies/1.1", None).await;
    assert_eq!(body["total_attempts"], 1);
    assert_eq!(body["mastery_level"], "novice");
}

#[tokio::test]
async fn test_start_validation_failures() {
    let app = create_test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions",
        Some(json!({ "user_id": "", "mode": "balanced" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions",
        Some(json!({ "user_id": "u", "difficulty": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions",
        Some(json!({ "user_id": "u", "topic_filter": ["loops"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions",
        Some(json!({ "mode": "balanced" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Failed to parse JSON"));
}

#[tokio::test]
async fn test_topic_filter_and_difficulty_scope_the_session() {
    let app = create_test_app().await;

    let (status, started) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions",
        Some(json!({
            "user_id": "u-scope",
            "mode": "balanced",
            "topic_filter": ["1.2"],
            "difficulty": 4
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(started["question"]["id"], "q-1.2-3");

    // the only matching question was just served
    let session_id = started["session_id"].as_str().unwrap();
    let (_, next) = send(
        &app,
        "POST",
        &format!("/api/v1/practice/sessions/{}/next", session_id),
        Some(json!({})),
    )
    .await;
    assert_eq!(next["finished"], true);
}

#[tokio::test]
async fn test_start_with_no_matching_content_is_not_stored() {
    let app = create_test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions",
        Some(json!({ "user_id": "u-none", "topic_filter": ["9.9"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "finished");
    assert!(body["question"].is_null());

    let session_id = body["session_id"].as_str().unwrap();
    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/v1/practice/sessions/{}", session_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_next_avoids_recent_questions_and_switches_mode() {
    let app = create_test_app().await;

    let (_, started) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions",
        Some(json!({ "user_id": "u-next", "mode": "competition" })),
    )
    .await;
    let session_id = started["session_id"].as_str().unwrap();
    let next_uri = format!("/api/v1/practice/sessions/{}/next", session_id);

    let mut seen = vec![started["question"]["id"].as_str().unwrap().to_string()];
    for _ in 0..8 {
        let (status, next) = send(&app, "POST", &next_uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let id = next["question"]["id"].as_str().unwrap().to_string();
        assert!(!seen.contains(&id), "question {} served twice", id);
        seen.push(id);
    }
    assert_eq!(seen.len(), 9);

    let (status, _) = send(&app, "POST", &next_uri, Some(json!({ "mode": "bogus" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, next) = send(&app, "POST", &next_uri, Some(json!({ "mode": "review" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(next["mode"], "review");
    assert_eq!(next["finished"], false);
    // window relaxed, but never the question served last
    assert_ne!(next["question"]["id"], seen[8].as_str());
}

#[tokio::test]
async fn test_get_and_end_session() {
    let app = create_test_app().await;

    let (_, started) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions",
        Some(json!({ "user_id": "u-end" })),
    )
    .await;
    assert_eq!(started["mode"], "balanced");
    let session_uri = format!(
        "/api/v1/practice/sessions/{}",
        started["session_id"].as_str().unwrap()
    );

    let (status, summary) = send(&app, "GET", &session_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["status"], "active");
    assert_eq!(summary["questions_served"], 1);
    assert!(summary.get("served").is_none());

    let (status, summary) = send(&app, "DELETE", &session_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["status"], "finished");

    let (status, _) = send(&app, "DELETE", &session_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_hint_check() {
    let app = create_app_with(vec![question("h1", "3.1", 1)]).await;

    let (_, started) = send(
        &app,
        "POST",
        "/api/v1/practice/sessions",
        Some(json!({ "user_id": "u-hint" })),
    )
    .await;
    let uri = format!(
        "/api/v1/practice/sessions/{}/hint-check",
        started["session_id"].as_str().unwrap()
    );

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(json!({ "question_id": "h1", "elapsed_ms": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["offer_hint"], false);

    let (_, body) = send(
        &app,
        "POST",
        &uri,
        Some(json!({ "question_id": "h1", "elapsed_ms": 240000 })),
    )
    .await;
    assert_eq!(body["offer_hint"], true);

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(json!({ "question_id": "nope", "elapsed_ms": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
