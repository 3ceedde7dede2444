use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::{error, info, warn};

use crate::github::webhooks::{WebhookProcessor, EVENT_HEADER, SIGNATURE_HEADER};
use crate::webhooks::dispatcher::Outcome;
use crate::AppState;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event_name = header(&headers, EVENT_HEADER);
    info!("Received webhook: {}", event_name.unwrap_or("unknown"));

    let secret = &state.config.github_webhook_secret;
    if !secret.is_empty() {
        if let Err(e) =
            WebhookProcessor::verify_signature(secret, header(&headers, SIGNATURE_HEADER), &body)
        {
            warn!("Rejected webhook: {}", e);
            return e.into_response();
        }
    }

    let event = match WebhookProcessor::classify(event_name, &body) {
        Ok(event) => event,
        Err(e) => {
            error!("{}", e);
            return e.into_response();
        }
    };

    match state.dispatcher.dispatch(event).await {
        Ok(Outcome::Ignored) => (StatusCode::OK, "pong").into_response(),
        Ok(Outcome::Evaluated(evaluation)) => (StatusCode::OK, Json(evaluation)).into_response(),
        Err(e) => e.into_response(),
    }
}
