//! REST endpoints for SMS dispatch.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::dispatch::{DispatchResult, Recipient, SmsDispatcher};
use super::templates::{self, AnnouncementPayload, BirthdayPayload};
use crate::store::RecipientStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct SmsState {
    pub dispatcher: Arc<SmsDispatcher>,
    /// Senior citizen lookup (None when running without a database).
    pub store: Option<Arc<dyn RecipientStore>>,
}

/// Build the Axum router with the SMS REST routes.
pub fn sms_routes(state: SmsState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sms/send", post(send_sms))
        .route("/api/sms/announce", post(announce))
        .route("/api/sms/birthdays", post(birthday_greetings))
        .route("/api/sms/preview", post(preview))
        .route("/api/sms/balance", get(balance))
        .with_state(state)
}

/// 200 on success, 400 for bad input, 500 for config/vendor failures.
fn status_for(result: &DispatchResult) -> StatusCode {
    if result.success {
        StatusCode::OK
    } else if result.is_invalid_request() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn store_missing() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "success": false,
            "message": "Recipient database is not configured",
            "error": "STORE_NOT_CONFIGURED",
        })),
    )
}

fn store_failed(e: impl std::fmt::Display) -> (StatusCode, Json<serde_json::Value>) {
    tracing::error!(error = %e, "Recipient lookup failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "success": false,
            "message": format!("Failed to load recipients: {e}"),
            "error": "DATABASE_ERROR",
        })),
    )
}

/// Malformed or mistyped JSON body: same envelope as a validation failure.
fn invalid_body(rejection: JsonRejection) -> Response {
    let message = rejection.body_text();
    warn!(error = %message, "Rejected malformed request body");
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "success": false,
            "message": message,
            "error": "INVALID_REQUEST",
        })),
    )
        .into_response()
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<SmsState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "osca-notify",
        "defaultProvider": state.dispatcher.default_provider(),
        "providers": state.dispatcher.provider_names(),
    }))
}

// ── Send ────────────────────────────────────────────────────────────────

/// A recipient as posted by the UI: either a bare number or `{number, name?}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipientInput {
    Number(String),
    Entry {
        number: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl From<RecipientInput> for Recipient {
    fn from(input: RecipientInput) -> Self {
        match input {
            RecipientInput::Number(number) => Recipient::new(number),
            RecipientInput::Entry { number, name } => Recipient {
                phone_number: number,
                display_name: name,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    #[serde(default)]
    recipients: Vec<RecipientInput>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    provider: Option<String>,
}

async fn send_sms(
    State(state): State<SmsState>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(rejection),
    };
    let recipients: Vec<Recipient> = body.recipients.into_iter().map(Recipient::from).collect();
    let result = state
        .dispatcher
        .send(&recipients, &body.message, body.provider.as_deref())
        .await;
    (status_for(&result), Json(result)).into_response()
}

// ── Announcement broadcast ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AnnounceRequest {
    #[serde(flatten)]
    announcement: AnnouncementPayload,
    #[serde(default)]
    barangay: Option<String>,
    #[serde(default)]
    provider: Option<String>,
}

async fn announce(
    State(state): State<SmsState>,
    body: Result<Json<AnnounceRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(rejection),
    };
    let Some(store) = state.store.as_ref() else {
        return store_missing().into_response();
    };

    let recipients = match store.active_recipients(body.barangay.as_deref()).await {
        Ok(r) => r,
        Err(e) => return store_failed(e).into_response(),
    };

    let message = templates::announcement(&body.announcement);
    info!(
        barangay = ?body.barangay,
        recipients = recipients.len(),
        "Broadcasting announcement"
    );

    let result = state
        .dispatcher
        .send(&recipients, &message, body.provider.as_deref())
        .await;
    (status_for(&result), Json(result)).into_response()
}

// ── Birthday greetings ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct BirthdayRequest {
    /// Defaults to today (server local time).
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    barangay: Option<String>,
    #[serde(default)]
    provider: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BirthdaySummary {
    success: bool,
    date: NaiveDate,
    celebrants: usize,
    sent: usize,
    failed: usize,
    results: Vec<DispatchResult>,
}

async fn birthday_greetings(
    State(state): State<SmsState>,
    body: Result<Json<BirthdayRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(rejection),
    };
    let Some(store) = state.store.as_ref() else {
        return store_missing().into_response();
    };

    let date = body.date.unwrap_or_else(|| Local::now().date_naive());
    let celebrants = match store.birthday_celebrants(date, body.barangay.as_deref()).await {
        Ok(c) => c,
        Err(e) => return store_failed(e).into_response(),
    };

    // Each greeting is personalised, so every celebrant gets its own send.
    let mut results = Vec::with_capacity(celebrants.len());
    for celebrant in &celebrants {
        let message = templates::birthday_greeting(&BirthdayPayload {
            senior_name: celebrant
                .recipient
                .display_name
                .clone()
                .unwrap_or_default(),
            age: Some(celebrant.age),
        });
        let result = state
            .dispatcher
            .send(
                std::slice::from_ref(&celebrant.recipient),
                &message,
                body.provider.as_deref(),
            )
            .await;
        if !result.success {
            warn!(
                senior = ?celebrant.recipient.display_name,
                error = ?result.error,
                "Birthday greeting not sent"
            );
        }
        results.push(result);
    }

    let sent = results.iter().filter(|r| r.success).count();
    let summary = BirthdaySummary {
        success: sent == results.len(),
        date,
        celebrants: celebrants.len(),
        sent,
        failed: results.len() - sent,
        results,
    };
    (StatusCode::OK, Json(summary)).into_response()
}

// ── Preview ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PreviewRequest {
    #[serde(default)]
    message: String,
}

async fn preview(body: Result<Json<PreviewRequest>, JsonRejection>) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(rejection),
    };
    let info = templates::message_info(&body.message);
    let truncated = templates::truncate_message(&body.message);
    Json(serde_json::json!({
        "message": truncated,
        "info": info,
        "truncated": truncated != body.message,
    }))
    .into_response()
}

// ── Balance ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BalanceQuery {
    #[serde(default)]
    provider: Option<String>,
}

async fn balance(
    State(state): State<SmsState>,
    Query(query): Query<BalanceQuery>,
) -> impl IntoResponse {
    let result = state.dispatcher.check_balance(query.provider.as_deref()).await;
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(result))
}
