use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{extract::Path, extract::State, Router};
use serde_json::json;

use super::domain::ApplicationId;
use super::email::EmailDelivery;
use super::form::FormState;
use super::gateway::PaymentGateway;
use super::repository::{ApplicationRepository, DocumentStore, RepositoryError};
use super::service::{ApplicationService, ApplicationServiceError};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Router exposing the submission, webhook, verification, and status
/// endpoints.
pub fn application_router<R, G, M, D>(service: Arc<ApplicationService<R, G, M, D>>) -> Router
where
    R: ApplicationRepository + 'static,
    G: PaymentGateway + 'static,
    M: EmailDelivery + 'static,
    D: DocumentStore + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(submit_handler::<R, G, M, D>))
        .route(
            "/api/v1/applications/:application_id",
            get(status_handler::<R, G, M, D>),
        )
        .route(
            "/api/v1/applications/:application_id/verify",
            post(verify_handler::<R, G, M, D>),
        )
        .route(
            "/api/v1/payments/webhook",
            post(webhook_handler::<R, G, M, D>),
        )
        .route(
            "/api/v1/fees/quote/:adults/:pets",
            get(fee_quote_handler::<R, G, M, D>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<R, G, M, D>(
    State(service): State<Arc<ApplicationService<R, G, M, D>>>,
    axum::Json(form): axum::Json<FormState>,
) -> Response
where
    R: ApplicationRepository + 'static,
    G: PaymentGateway + 'static,
    M: EmailDelivery + 'static,
    D: DocumentStore + 'static,
{
    match service.submit(&form) {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Err(ApplicationServiceError::Step(error)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(ApplicationServiceError::Invalid(error)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(_) => {
            // Persistence and session-creation failures surface as one
            // generic retryable message.
            let payload = json!({
                "error": "failed to process your application, please try again",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn webhook_handler<R, G, M, D>(
    State(service): State<Arc<ApplicationService<R, G, M, D>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    R: ApplicationRepository + 'static,
    G: PaymentGateway + 'static,
    M: EmailDelivery + 'static,
    D: DocumentStore + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let Some(signature) = signature else {
        let payload = json!({ "error": "missing signature" });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    };

    match service.handle_webhook(&body, signature) {
        // Idempotent re-deliveries and unmatched sessions are acknowledged
        // too, so the provider never enters a retry storm.
        Ok(_) => (StatusCode::OK, axum::Json(json!({ "received": true }))).into_response(),
        Err(ApplicationServiceError::Signature(error)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(ApplicationServiceError::EventParse(error)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn verify_handler<R, G, M, D>(
    State(service): State<Arc<ApplicationService<R, G, M, D>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    G: PaymentGateway + 'static,
    M: EmailDelivery + 'static,
    D: DocumentStore + 'static,
{
    let id = ApplicationId(application_id);
    match service.verify_payment(&id) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn status_handler<R, G, M, D>(
    State(service): State<Arc<ApplicationService<R, G, M, D>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    G: PaymentGateway + 'static,
    M: EmailDelivery + 'static,
    D: DocumentStore + 'static,
{
    let id = ApplicationId(application_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(ApplicationServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({ "error": "application not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn fee_quote_handler<R, G, M, D>(
    State(service): State<Arc<ApplicationService<R, G, M, D>>>,
    Path((adults, pets)): Path<(u32, u32)>,
) -> Response
where
    R: ApplicationRepository + 'static,
    G: PaymentGateway + 'static,
    M: EmailDelivery + 'static,
    D: DocumentStore + 'static,
{
    (StatusCode::OK, axum::Json(service.quote(adults, pets))).into_response()
}
