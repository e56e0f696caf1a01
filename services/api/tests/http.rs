//! services/api/tests/http.rs
//!
//! Drives the full router against in-memory ports.

use api_lib::config::Config;
use api_lib::web::{build_router, AppState};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Days, Utc};
use flashcards_core::testing::{InMemoryFlashcardStore, ScriptedCompletion, StaticPdfText};
use flashcards_core::{
    ContentExtractor, FlashcardGateway, FlashcardGenerator, FlashcardPipeline, ResponseValidator,
    ValidationMode,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tracing::Level;

const BOUNDARY: &str = "flashcards-test-boundary";

const FENCED_RESPONSE: &str = "```json\n[\n  {\"question\": \"What is Rust?\", \"answer\": \"A systems programming language.\"},\n  {\"question\": \"What does the borrow checker enforce?\", \"answer\": \"Aliasing XOR mutability.\"}\n]\n```";

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: Level::INFO,
        gemini_api_key: None,
        model_api_base: "http://127.0.0.1:9".to_string(),
        flashcard_model: "gemini-2.5-flash".to_string(),
        generation_timeout: Duration::from_secs(5),
        validation_mode: ValidationMode::AllOrNothing,
        max_upload_bytes: 1024 * 1024,
        cors_allow_origin: None,
    }
}

fn app_with(completion: ScriptedCompletion, store: InMemoryFlashcardStore) -> Router {
    let store = Arc::new(store);
    let pipeline = FlashcardPipeline::new(
        ContentExtractor::new(Arc::new(StaticPdfText::pages(vec!["Text from a PDF page."]))),
        FlashcardGenerator::new(Arc::new(completion), Duration::from_secs(5)),
        ResponseValidator::new(ValidationMode::AllOrNothing),
        FlashcardGateway::new(store.clone()),
    );
    let app_state = Arc::new(AppState {
        config: Arc::new(test_config()),
        pipeline: Arc::new(pipeline),
        store,
    });
    build_router(app_state).unwrap()
}

fn app(completion: ScriptedCompletion) -> Router {
    app_with(completion, InMemoryFlashcardStore::default())
}

fn upload_request(content_type: &str, contents: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"notes\"\r\n",
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn seed_cards(app: &Router, count: usize) {
    for n in 1..=count {
        let (status, _) = send(
            app.clone(),
            json_request(
                Method::POST,
                "/cards",
                json!({"question": format!("Question {n}"), "answer": format!("Answer {n}")}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

//=========================================================================================
// Upload
//=========================================================================================

#[tokio::test]
async fn text_upload_returns_stored_flashcards() {
    let store = InMemoryFlashcardStore::default();
    let app = app_with(ScriptedCompletion::chunks(vec![FENCED_RESPONSE]), store.clone());

    let (status, body) = send(app, upload_request("text/plain", b"Rust is a language.")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    let cards = body["flashcards"].as_array().unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0]["cardId"], 1);
    assert_eq!(cards[0]["question"], "What is Rust?");
    assert_eq!(cards[1]["answer"], "Aliasing XOR mutability.");
    assert_eq!(cards[0]["metadata"]["interval"], 0);
    assert_eq!(cards[0]["metadata"]["ease_factor"], 2.5);
    assert_eq!(
        cards[0]["metadata"]["next_review"],
        Utc::now().date_naive().to_string()
    );
    assert_eq!(store.card_count(), 2);
    assert_eq!(store.metadata_count(), 2);
}

#[tokio::test]
async fn pdf_upload_uses_the_extracted_page_text() {
    let completion = ScriptedCompletion::chunks(vec![
        "[{\"question\": \"Q\", ",
        "\"answer\": \"A\"}]",
    ]);
    let prompts = completion.prompts();

    let (status, body) = send(app(completion), upload_request("application/pdf", b"%PDF-1.4")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flashcards"].as_array().unwrap().len(), 1);
    let prompts = prompts.lock().unwrap();
    assert!(prompts[0].contains("Text from a PDF page."));
}

#[tokio::test]
async fn unsupported_media_type_is_rejected_before_the_model_is_called() {
    let completion = ScriptedCompletion::chunks(vec![FENCED_RESPONSE]);
    let prompts = completion.prompts();

    let (status, body) = send(app(completion), upload_request("image/png", b"\x89PNG")).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("image/png"));
    assert!(prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_utf8_text_is_unprocessable() {
    let (status, body) = send(
        app(ScriptedCompletion::chunks(vec![FENCED_RESPONSE])),
        upload_request("text/plain", &[0xff, 0xfe, 0xfd]),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn malformed_model_output_is_a_bad_gateway_and_stores_nothing() {
    let store = InMemoryFlashcardStore::default();
    let app = app_with(
        ScriptedCompletion::chunks(vec!["[{\"question\": \"Q\", \"answer\""]),
        store.clone(),
    );

    let (status, body) = send(app, upload_request("text/plain", b"notes")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("Raw response"));
    assert_eq!(store.sessions_opened(), 0);
}

#[tokio::test]
async fn one_invalid_candidate_rejects_the_whole_batch() {
    let store = InMemoryFlashcardStore::default();
    let app = app_with(
        ScriptedCompletion::chunks(vec![
            "[{\"question\": \"Q1\", \"answer\": \"A1\"}, {\"question\": \"Q2\"}]",
        ]),
        store.clone(),
    );

    let (status, body) = send(app, upload_request("text/plain", b"notes")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["message"].as_str().unwrap().contains("answer"));
    assert_eq!(store.card_count(), 0);
}

#[tokio::test]
async fn missing_credential_is_an_internal_error() {
    let (status, body) = send(
        app(ScriptedCompletion::missing_credential("GEMINI_API_KEY")),
        upload_request("text/plain", b"notes"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("GEMINI_API_KEY"));
}

#[tokio::test]
async fn failed_commit_reports_an_error_and_keeps_nothing() {
    let store = InMemoryFlashcardStore::default().failing_commits();
    let app = app_with(ScriptedCompletion::chunks(vec![FENCED_RESPONSE]), store.clone());

    let (status, body) = send(app, upload_request("text/plain", b"notes")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(store.card_count(), 0);
    assert_eq!(store.rollbacks(), 1);
}

#[tokio::test]
async fn upload_without_a_multipart_body_is_a_bad_request() {
    let request = json_request(Method::POST, "/upload", json!({"file": "notes"}));

    let (status, body) = send(app(ScriptedCompletion::chunks(vec![])), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

//=========================================================================================
// Card Management
//=========================================================================================

#[tokio::test]
async fn root_greets_the_caller() {
    let (status, body) = send(
        app(ScriptedCompletion::chunks(vec![])),
        empty_request(Method::GET, "/"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Welcome to the flashcard generation service"
    );
}

#[tokio::test]
async fn created_cards_are_listed_in_id_order() {
    let app = app(ScriptedCompletion::chunks(vec![]));
    seed_cards(&app, 3).await;

    let (status, body) = send(app, empty_request(Method::GET, "/cards")).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|card| card["cardId"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn blank_or_missing_fields_are_rejected_on_create() {
    let app = app(ScriptedCompletion::chunks(vec![]));

    let (status, body) = send(
        app.clone(),
        json_request(Method::POST, "/cards", json!({"question": "Q", "answer": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, _) = send(
        app,
        json_request(Method::POST, "/cards", json!({"question": "Q"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_update_and_delete_a_card() {
    let store = InMemoryFlashcardStore::default();
    let app = app_with(ScriptedCompletion::chunks(vec![]), store.clone());
    seed_cards(&app, 1).await;

    let (status, body) = send(app.clone(), empty_request(Method::GET, "/cards/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["question"], "Question 1");

    let (status, body) = send(
        app.clone(),
        json_request(
            Method::PUT,
            "/cards/1",
            json!({"question": "New question", "answer": "New answer"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["question"], "New question");
    assert_eq!(body["metadata"]["ease_factor"], 2.5);

    let (status, body) = send(app.clone(), empty_request(Method::DELETE, "/cards/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Card id: 1 deleted successfully");
    assert_eq!(store.card_count(), 0);
    assert_eq!(store.metadata_count(), 0);

    let (status, body) = send(app, empty_request(Method::GET, "/cards/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn unknown_cards_are_not_found() {
    let app = app(ScriptedCompletion::chunks(vec![]));

    let (status, _) = send(
        app.clone(),
        json_request(Method::PUT, "/cards/42", json!({"question": "Q", "answer": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(app.clone(), empty_request(Method::DELETE, "/cards/42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(app, empty_request(Method::GET, "/cards/not-a-number")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn due_cards_exclude_future_reviews() {
    let store = InMemoryFlashcardStore::default();
    let app = app_with(ScriptedCompletion::chunks(vec![]), store.clone());
    seed_cards(&app, 2).await;

    let tomorrow = Utc::now().date_naive().checked_add_days(Days::new(1)).unwrap();
    store.set_next_review(2, tomorrow);

    let (status, body) = send(app, empty_request(Method::GET, "/cards/due")).await;

    assert_eq!(status, StatusCode::OK);
    let due = body.as_array().unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0]["cardId"], 1);
}
