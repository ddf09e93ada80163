//! Inbound message webhooks.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Form, Json};
use brain_core::InboundMessage;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::AppState;

/// JSON inbound message (web chat, call transcripts).
#[derive(Debug, Deserialize)]
pub struct InboundRequest {
    pub identity: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct InboundResponse {
    pub reply: String,
}

/// Gateway SMS webhook form.
#[derive(Debug, Deserialize)]
pub struct SmsForm {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

fn received(identity: String, text: String) -> InboundMessage {
    let timestamp = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    InboundMessage::new(identity, text, timestamp)
}

/// Handle a message and return the reply in the response body.
pub async fn inbound_json(
    State(state): State<AppState>,
    Json(request): Json<InboundRequest>,
) -> Json<InboundResponse> {
    info!(identity = %request.identity, "Inbound message");
    let reply = state
        .orchestrator
        .process(received(request.identity, request.text))
        .await;
    Json(InboundResponse { reply: reply.text })
}

/// Handle an SMS and reply through the gateway.
pub async fn inbound_sms(State(state): State<AppState>, Form(form): Form<SmsForm>) -> StatusCode {
    info!(identity = %form.from, "Inbound SMS");
    state
        .orchestrator
        .reply_via_sender(received(form.from, form.body))
        .await;
    StatusCode::NO_CONTENT
}
