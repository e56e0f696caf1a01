//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{pipeline_status, port_status};
use crate::web::protocol::{
    CardMetadataResponse, CardPayload, ErrorResponse, FlashcardResponse, MessageResponse,
    ResponseStatus, UploadResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
        Multipart, Path, State,
    },
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use flashcards_core::domain::{CardId, NewFlashcard, UploadedDocument};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        root_handler,
        upload_handler,
        list_cards_handler,
        due_cards_handler,
        get_card_handler,
        create_card_handler,
        update_card_handler,
        delete_card_handler,
    ),
    components(
        schemas(
            UploadResponse,
            FlashcardResponse,
            CardMetadataResponse,
            ErrorResponse,
            MessageResponse,
            CardPayload,
            ResponseStatus,
        )
    ),
    tags(
        (name = "Flashcards API", description = "Generate study flashcards from documents and manage them.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Responses
//=========================================================================================

/// Every handler fails with a status code and an `ErrorResponse` body.
pub type HandlerError = (StatusCode, Json<ErrorResponse>);

fn failure(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (status, Json(ErrorResponse::new(message)))
}

fn path_id(card_id: Result<Path<CardId>, PathRejection>) -> Result<CardId, HandlerError> {
    card_id
        .map(|Path(card_id)| card_id)
        .map_err(|e| failure(StatusCode::BAD_REQUEST, e.body_text()))
}

/// Both fields are required and must contain more than whitespace.
fn card_from_payload(
    payload: Result<Json<CardPayload>, JsonRejection>,
) -> Result<NewFlashcard, HandlerError> {
    let Json(payload) = payload.map_err(|e| failure(StatusCode::BAD_REQUEST, e.body_text()))?;
    let (Some(question), Some(answer)) = (payload.question, payload.answer) else {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "Both 'question' and 'answer' are required",
        ));
    };
    NewFlashcard::new(question, answer)
        .map_err(|e| failure(StatusCode::BAD_REQUEST, format!("Invalid flashcard: {}", e)))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Greets the caller; useful as a liveness probe.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "The service is up", body = MessageResponse)
    )
)]
pub async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to the flashcard generation service".to_string(),
    })
}

/// Generate flashcards from an uploaded document.
///
/// Accepts a multipart/form-data request with a single file part, declared as
/// `text/plain` or `application/pdf`. The generated cards are stored before
/// they are returned.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content_type = "multipart/form-data", description = "The document to turn into flashcards."),
    responses(
        (status = 200, description = "Flashcards generated and stored", body = UploadResponse),
        (status = 400, description = "The request did not carry a file part", body = ErrorResponse),
        (status = 415, description = "The file is neither text nor PDF", body = ErrorResponse),
        (status = 422, description = "The file could not be read as text", body = ErrorResponse),
        (status = 500, description = "Missing credential or storage failure", body = ErrorResponse),
        (status = 502, description = "The model failed or answered with unusable output", body = ErrorResponse),
        (status = 504, description = "The model did not answer in time", body = ErrorResponse)
    )
)]
pub async fn upload_handler(
    State(app_state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, HandlerError> {
    let request_id = Uuid::new_v4();

    async move {
        let mut multipart = multipart.map_err(|e| {
            warn!(error = %e, "Rejected upload without a multipart body");
            failure(StatusCode::BAD_REQUEST, e.body_text())
        })?;

        let field = multipart
            .next_field()
            .await
            .map_err(|e| {
                failure(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read multipart data: {}", e),
                )
            })?
            .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "Multipart form must include a file"))?;

        let declared_type = field.content_type().unwrap_or_default().to_string();
        info!(
            file_name = field.file_name().unwrap_or("untitled"),
            content_type = %declared_type,
            "Received upload"
        );

        match app_state
            .pipeline
            .run(UploadedDocument::new(declared_type, field))
            .await
        {
            Ok(records) => Ok(Json(UploadResponse::success(records))),
            Err(e) => {
                let status = pipeline_status(&e);
                error!(error = %e, status = status.as_u16(), "Upload failed");
                Err(failure(status, e.to_string()))
            }
        }
    }
    .instrument(info_span!("upload", %request_id))
    .await
}

/// List every stored flashcard with its metadata.
#[utoipa::path(
    get,
    path = "/cards",
    responses(
        (status = 200, description = "All cards, ordered by id", body = [FlashcardResponse]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_cards_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<FlashcardResponse>>, HandlerError> {
    let records = app_state.store.list_flashcards().await.map_err(|e| {
        error!("Failed to list cards: {:?}", e);
        failure(port_status(&e), e.to_string())
    })?;
    Ok(Json(records.into_iter().map(FlashcardResponse::from).collect()))
}

/// List the flashcards due for review today or earlier.
#[utoipa::path(
    get,
    path = "/cards/due",
    responses(
        (status = 200, description = "Cards whose next review is on or before today", body = [FlashcardResponse]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn due_cards_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<FlashcardResponse>>, HandlerError> {
    let today = Utc::now().date_naive();
    let records = app_state
        .store
        .list_due_flashcards(today)
        .await
        .map_err(|e| {
            error!("Failed to list due cards: {:?}", e);
            failure(port_status(&e), e.to_string())
        })?;
    Ok(Json(records.into_iter().map(FlashcardResponse::from).collect()))
}

/// Fetch a single flashcard.
#[utoipa::path(
    get,
    path = "/cards/{id}",
    params(
        ("id" = i32, Path, description = "The card id.")
    ),
    responses(
        (status = 200, description = "The card", body = FlashcardResponse),
        (status = 404, description = "No card with this id", body = ErrorResponse)
    )
)]
pub async fn get_card_handler(
    State(app_state): State<Arc<AppState>>,
    card_id: Result<Path<CardId>, PathRejection>,
) -> Result<Json<FlashcardResponse>, HandlerError> {
    let card_id = path_id(card_id)?;
    let record = app_state
        .store
        .get_flashcard(card_id)
        .await
        .map_err(|e| failure(port_status(&e), e.to_string()))?;
    Ok(Json(record.into()))
}

/// Create a single flashcard by hand.
///
/// The card gets fresh review metadata, exactly like a generated one.
#[utoipa::path(
    post,
    path = "/cards",
    request_body = CardPayload,
    responses(
        (status = 201, description = "Card created", body = FlashcardResponse),
        (status = 400, description = "Question or answer missing or blank", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_card_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<CardPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<FlashcardResponse>), HandlerError> {
    let card = card_from_payload(payload)?;
    let record = app_state.pipeline.gateway().create(card).await.map_err(|e| {
        error!("Failed to create card: {:?}", e);
        failure(pipeline_status(&e), e.to_string())
    })?;
    info!(card_id = record.card_id, "Card created");
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Replace the question and answer of a flashcard. Its metadata is kept.
#[utoipa::path(
    put,
    path = "/cards/{id}",
    params(
        ("id" = i32, Path, description = "The card id.")
    ),
    request_body = CardPayload,
    responses(
        (status = 200, description = "Card updated", body = FlashcardResponse),
        (status = 400, description = "Question or answer missing or blank", body = ErrorResponse),
        (status = 404, description = "No card with this id", body = ErrorResponse)
    )
)]
pub async fn update_card_handler(
    State(app_state): State<Arc<AppState>>,
    card_id: Result<Path<CardId>, PathRejection>,
    payload: Result<Json<CardPayload>, JsonRejection>,
) -> Result<Json<FlashcardResponse>, HandlerError> {
    let card_id = path_id(card_id)?;
    let card = card_from_payload(payload)?;
    let record = app_state
        .store
        .update_flashcard(card_id, &card)
        .await
        .map_err(|e| failure(port_status(&e), e.to_string()))?;
    info!(card_id, "Card updated");
    Ok(Json(record.into()))
}

/// Delete a flashcard together with its metadata.
#[utoipa::path(
    delete,
    path = "/cards/{id}",
    params(
        ("id" = i32, Path, description = "The card id.")
    ),
    responses(
        (status = 200, description = "Card deleted", body = MessageResponse),
        (status = 404, description = "No card with this id", body = ErrorResponse)
    )
)]
pub async fn delete_card_handler(
    State(app_state): State<Arc<AppState>>,
    card_id: Result<Path<CardId>, PathRejection>,
) -> Result<Json<MessageResponse>, HandlerError> {
    let card_id = path_id(card_id)?;
    app_state
        .store
        .delete_flashcard(card_id)
        .await
        .map_err(|e| failure(port_status(&e), e.to_string()))?;
    info!(card_id, "Card deleted");
    Ok(Json(MessageResponse {
        message: format!("Card id: {} deleted successfully", card_id),
    }))
}
