use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use interview_api::{AppState, create_router};
use interview_core::speech::{ListenOutcome, SilentSpeakerFactory, SpeechInput};
use interview_core::{Evaluation, InMemorySessionStore, Interviewer, QuestionContext, ResponseBreakdown};
use tokio::sync::Notify;

struct StubInterviewer;

#[async_trait::async_trait]
impl Interviewer for StubInterviewer {
    async fn generate_question(&self, context: &QuestionContext) -> anyhow::Result<String> {
        Ok(format!("Question {} about {}?", context.question_num, context.role.name))
    }

    async fn evaluate_answer(
        &self,
        _question: &str,
        _answer: &str,
        _role_name: &str,
    ) -> anyhow::Result<Evaluation> {
        Ok(Evaluation {
            strengths: vec!["Clear".to_string()],
            weaknesses: vec![],
            score: 8.0,
            suggestion: "Add an example.".to_string(),
        })
    }

    async fn conversational_feedback(
        &self,
        _answer: &str,
        _question_num: u32,
        _candidate_name: &str,
    ) -> anyhow::Result<String> {
        Ok("Nice structure, add a concrete example.".to_string())
    }

    async fn final_report(
        &self,
        _role_name: &str,
        responses: &[ResponseBreakdown],
    ) -> anyhow::Result<String> {
        Ok(format!("Reviewed {} answers.", responses.len()))
    }
}

/// Holds the final report back until the test releases it.
#[derive(Default)]
struct SlowReportInterviewer {
    report_started: Notify,
    release_report: Notify,
}

#[async_trait::async_trait]
impl Interviewer for SlowReportInterviewer {
    async fn generate_question(&self, context: &QuestionContext) -> anyhow::Result<String> {
        StubInterviewer.generate_question(context).await
    }

    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        role_name: &str,
    ) -> anyhow::Result<Evaluation> {
        StubInterviewer.evaluate_answer(question, answer, role_name).await
    }

    async fn conversational_feedback(
        &self,
        answer: &str,
        question_num: u32,
        candidate_name: &str,
    ) -> anyhow::Result<String> {
        StubInterviewer
            .conversational_feedback(answer, question_num, candidate_name)
            .await
    }

    async fn final_report(
        &self,
        role_name: &str,
        responses: &[ResponseBreakdown],
    ) -> anyhow::Result<String> {
        self.report_started.notify_one();
        self.release_report.notified().await;
        StubInterviewer.final_report(role_name, responses).await
    }
}

enum StubListener {
    Hears(&'static str),
    Outcome(ListenOutcome),
    Broken,
}

#[async_trait::async_trait]
impl SpeechInput for StubListener {
    async fn listen_once(&self) -> anyhow::Result<ListenOutcome> {
        match self {
            StubListener::Hears(text) => Ok(ListenOutcome::Transcribed(text.to_string())),
            StubListener::Outcome(outcome) => Ok(outcome.clone()),
            StubListener::Broken => Err(anyhow::anyhow!("capture thread panicked")),
        }
    }
}

fn create_test_app_from(interviewer: Arc<dyn Interviewer>, listener: StubListener, static_dir: &Path) -> Router {
    let state = AppState::new(
        Arc::new(InMemorySessionStore::new()),
        interviewer,
        Arc::new(listener),
        Arc::new(SilentSpeakerFactory),
    );
    create_router(state, static_dir)
}

fn create_test_app_with(listener: StubListener, static_dir: &Path) -> Router {
    create_test_app_from(Arc::new(StubInterviewer), listener, static_dir)
}

fn create_test_app() -> Router {
    create_test_app_with(
        StubListener::Hears("I design APIs."),
        Path::new("/nonexistent-static-dir"),
    )
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn start(app: &Router, body: Value) -> String {
    let (status, body) = post(app, "/api/start-interview", body).await;
    assert_eq!(status, StatusCode::OK);
    body["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn given_running_server_when_health_check_then_returns_ok() {
    let app = create_test_app();
    let (status, body) = send(
        &app,
        Request::builder().uri("/api/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "status": "ok"}));
}

#[tokio::test]
async fn given_catalog_request_then_lists_roles_and_levels() {
    let app = create_test_app();
    let (status, body) = send(
        &app,
        Request::builder().uri("/api/catalog").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roles"].as_array().unwrap().len(), 5);
    assert_eq!(body["experience_levels"].as_array().unwrap().len(), 3);
    assert_eq!(body["roles"][0]["name"], "Software Engineer");
}

#[tokio::test]
async fn given_candidate_name_when_starting_then_intro_greets_by_name() {
    let app = create_test_app();
    let (status, body) = post(
        &app,
        "/api/start-interview",
        json!({"role": "1", "experience": "1", "duration_minutes": 10, "candidate_name": "Ana"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["role_name"], "Software Engineer");
    assert_eq!(body["experience_name"], "Fresher or Entry Level");
    assert_eq!(body["duration_minutes"], 10);
    assert_eq!(
        body["intro_text"],
        "Welcome, Ana! This is your 10-minute Software Engineer interview at Fresher or Entry Level. I'll ask questions, you answer using your voice. Use headphones to avoid echo. Let's begin!"
    );
    assert!(!body["session_id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn given_no_name_and_numeric_keys_when_starting_then_generic_greeting_and_defaults() {
    let app = create_test_app();
    let (status, body) = post(&app, "/api/start-interview", json!({"role": 5, "experience": 3})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role_name"], "Data Analyst");
    assert_eq!(body["duration_minutes"], 5);
    let intro = body["intro_text"].as_str().unwrap();
    assert!(intro.starts_with("Welcome! This is your 5-minute Data Analyst interview"));
}

#[tokio::test]
async fn given_unknown_role_when_starting_then_bad_request() {
    let app = create_test_app();
    let (status, body) = post(&app, "/api/start-interview", json!({"role": "9"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("Unknown role"));
}

#[tokio::test]
async fn given_missing_body_when_posting_then_no_data_provided() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/start-interview")
            .header("content-type", "application/json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "message": "No data provided"}));

    let (status, body) = post(&app, "/api/save-answer", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No data provided");
}

#[tokio::test]
async fn given_unknown_session_then_session_not_found() {
    let app = create_test_app();

    for uri in [
        "/api/speak",
        "/api/get-question",
        "/api/save-answer",
        "/api/conversational-response",
        "/api/record-answer",
        "/api/complete-interview",
    ] {
        let (status, body) = post(&app, uri, json!({"session_id": "missing"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body, json!({"success": false, "message": "Session not found"}), "{uri}");
    }
}

#[tokio::test]
async fn given_numeric_session_id_then_session_not_found() {
    let app = create_test_app();

    let (status, body) = post(&app, "/api/get-question", json!({"session_id": 123})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Session not found");

    let (status, body) = post(&app, "/api/complete-interview", json!({"session_id": 123})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Session not found");
}

#[tokio::test]
async fn given_wrongly_typed_fields_then_invalid_request_body() {
    let app = create_test_app();
    let session_id = start(&app, json!({"role": "1"})).await;

    let (status, body) = post(
        &app,
        "/api/get-question",
        json!({"session_id": session_id, "asked_questions": ["a", null]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "message": "Invalid request body"}));

    let (status, body) = post(
        &app,
        "/api/save-answer",
        json!({"session_id": session_id, "answer": {"text": "hi"}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request body");
}

#[tokio::test]
async fn given_unknown_session_when_stopping_speech_then_still_succeeds() {
    let app = create_test_app();
    let (status, body) = post(&app, "/api/stop-speech", json!({"session_id": "missing"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (status, _) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/stop-speech")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn given_no_session_id_when_completing_then_bad_request() {
    let app = create_test_app();

    let (status, body) = post(&app, "/api/complete-interview", json!({"other": 1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No session_id provided");

    let (status, body) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/complete-interview")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No session_id provided");
}

#[tokio::test]
async fn given_full_interview_when_completing_then_report_averages_and_session_is_removed() {
    let app = create_test_app();
    let session_id = start(&app, json!({"role": "1", "experience": "1", "candidate_name": "Ana"})).await;

    let (status, body) = post(
        &app,
        "/api/speak",
        json!({"session_id": session_id, "text": "Welcome!"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, first) = post(
        &app,
        "/api/get-question",
        json!({"session_id": session_id, "asked_questions": []}),
    )
    .await;
    assert_eq!(first["question_number"], 1);
    assert_eq!(
        first["question"],
        "Tell me about yourself and your experience as a Software Engineer."
    );
    let first_question = first["question"].as_str().unwrap().to_string();

    let (status, _) = post(
        &app,
        "/api/save-answer",
        json!({"session_id": session_id, "question": first_question, "answer": "I build backends."}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, feedback) = post(
        &app,
        "/api/conversational-response",
        json!({"session_id": session_id, "answer": "I build backends.", "question_num": 1}),
    )
    .await;
    assert_eq!(feedback["response"], "Nice structure, add a concrete example.");

    let (_, second) = post(
        &app,
        "/api/get-question",
        json!({"session_id": session_id, "asked_questions": [first_question]}),
    )
    .await;
    assert_eq!(second["question_number"], 2);
    assert_eq!(second["question"], "Question 2 about Software Engineer?");

    post(
        &app,
        "/api/save-answer",
        json!({"session_id": session_id, "question": second["question"], "answer": "   "}),
    )
    .await;

    let (status, body) = post(&app, "/api/complete-interview", json!({"session_id": session_id})).await;
    assert_eq!(status, StatusCode::OK);
    let report = &body["report"];
    assert_eq!(report["avg_score"], 4.0);
    assert_eq!(report["total_questions"], 2);
    assert_eq!(report["responses"][0]["score"], 8.0);
    assert_eq!(report["responses"][0]["empty"], false);
    assert_eq!(report["responses"][1]["score"], 0.0);
    assert_eq!(report["responses"][1]["empty"], true);
    assert_eq!(report["responses"][1]["answer"], "[No answer provided]");
    assert_eq!(report["final_feedback"], "Reviewed 2 answers.");

    let (status, body) = post(&app, "/api/complete-interview", json!({"session_id": session_id})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Session not found");
}

#[tokio::test]
async fn given_no_answers_when_completing_then_empty_report() {
    let app = create_test_app();
    let session_id = start(&app, json!({"role": "2"})).await;

    let (status, body) = post(&app, "/api/complete-interview", json!({"session_id": session_id})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["avg_score"], 0.0);
    assert_eq!(body["report"]["total_questions"], 0);
    assert_eq!(body["report"]["final_feedback"], "No responses were recorded.");
}

#[tokio::test]
async fn given_report_in_progress_then_late_requests_find_no_session() {
    let interviewer = Arc::new(SlowReportInterviewer::default());
    let app = create_test_app_from(
        interviewer.clone(),
        StubListener::Hears(""),
        Path::new("/nonexistent-static-dir"),
    );
    let session_id = start(&app, json!({"role": "1"})).await;
    post(
        &app,
        "/api/save-answer",
        json!({"session_id": session_id, "question": "Q1", "answer": "I build backends."}),
    )
    .await;

    let completing = tokio::spawn({
        let app = app.clone();
        let session_id = session_id.clone();
        async move { post(&app, "/api/complete-interview", json!({"session_id": session_id})).await }
    });
    interviewer.report_started.notified().await;

    let (status, body) = post(
        &app,
        "/api/save-answer",
        json!({"session_id": session_id, "question": "Q2", "answer": "Too late."}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Session not found");

    let (status, _) = post(&app, "/api/complete-interview", json!({"session_id": session_id})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    interviewer.release_report.notify_one();
    let (status, body) = completing.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["total_questions"], 1);
    assert_eq!(body["report"]["final_feedback"], "Reviewed 1 answers.");
}

async fn record_with(listener: StubListener) -> (StatusCode, Value) {
    let app = create_test_app_with(listener, Path::new("/nonexistent-static-dir"));
    let session_id = start(&app, json!({"role": "1"})).await;
    post(&app, "/api/record-answer", json!({"session_id": session_id})).await
}

#[tokio::test]
async fn given_clear_speech_when_recording_then_returns_transcript() {
    let (status, body) = record_with(StubListener::Hears("I design APIs.")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "answer": "I design APIs."}));
}

#[tokio::test]
async fn given_recognition_problems_when_recording_then_soft_failures() {
    let (status, body) = record_with(StubListener::Outcome(ListenOutcome::Unintelligible)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Sorry, I could not clearly understand your speech. Please try speaking again."
    );

    let (status, body) = record_with(StubListener::Outcome(ListenOutcome::ServiceError(
        "status 503".to_string(),
    )))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Speech recognition service error: status 503");

    let (status, body) = record_with(StubListener::Outcome(ListenOutcome::DeviceUnavailable(
        "no default input device".to_string(),
    )))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Microphone not available. Please check your input device and try again."
    );
}

#[tokio::test]
async fn given_broken_listener_when_recording_then_internal_error() {
    let (status, body) = record_with(StubListener::Broken).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"success": false, "message": "Unexpected error while recording."})
    );
}

#[tokio::test]
async fn given_unknown_route_then_endpoint_not_found() {
    let app = create_test_app();

    let (status, body) = post(&app, "/api/does-not-exist", json!({"x": 1})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"success": false, "message": "Endpoint not found"}));

    let (status, body) = send(
        &app,
        Request::builder().uri("/missing.html").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Endpoint not found");
}

#[tokio::test]
async fn given_static_dir_then_serves_frontend() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>Interview</h1>").unwrap();
    let app = create_test_app_with(StubListener::Hears(""), dir.path());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"<h1>Interview</h1>");
}
