//! Health check endpoint.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: u16,
    message: &'static str,
    mailing_list: Vec<String>,
    mail_host: String,
    mail_user: String,
}

/// Service health: are mail credentials and the mailing list in place?
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let mut status = StatusCode::OK;
    let mut message = "Service is running OK!";

    let mail = &state.config.mail;
    if mail.host.is_empty() || mail.user.is_empty() || mail.pass.is_empty() {
        status = StatusCode::SERVICE_UNAVAILABLE;
        message = "Mail credentials not set!";
    }

    if state.mailing_list.is_empty() {
        status = StatusCode::SERVICE_UNAVAILABLE;
        message = "Mailing list is not found or empty!";
    }

    let response = HealthResponse {
        status: status.as_u16(),
        message,
        mailing_list: state.mailing_list.as_ref().clone(),
        mail_host: mail.host.clone(),
        mail_user: mail.user.clone(),
    };

    (status, Json(response))
}
