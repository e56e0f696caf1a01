//! services/api/src/web/router.rs
//!
//! Assembles the HTTP routes, the middleware layers and the Swagger UI into one router.

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::web::rest::{
    create_card_handler, delete_card_handler, due_cards_handler, get_card_handler,
    list_cards_handler, root_handler, update_card_handler, upload_handler, ApiDoc,
};
use crate::web::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Builds the application router on top of the shared state.
pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let cors = cors_layer(app_state.config.cors_allow_origin.as_deref())?;
    let body_limit = DefaultBodyLimit::max(app_state.config.max_upload_bytes);

    let api_router = Router::new()
        .route("/", get(root_handler))
        .route("/upload", post(upload_handler))
        .route("/cards", get(list_cards_handler).post(create_card_handler))
        .route("/cards/due", get(due_cards_handler))
        .route(
            "/cards/{id}",
            get(get_card_handler)
                .put(update_card_handler)
                .delete(delete_card_handler),
        )
        .layer(body_limit)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}

fn cors_layer(allow_origin: Option<&str>) -> Result<CorsLayer, ApiError> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    match allow_origin {
        None => Ok(cors.allow_origin(Any)),
        Some(origin) => {
            let origin = origin.parse::<HeaderValue>().map_err(|e| {
                ConfigError::InvalidValue("CORS_ALLOW_ORIGIN".to_string(), e.to_string())
            })?;
            Ok(cors.allow_origin(origin))
        }
    }
}
