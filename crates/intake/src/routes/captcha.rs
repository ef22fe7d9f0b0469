//! CAPTCHA issuance endpoint.

use axum::{
    extract::State,
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};

use intake_common::constants::headers::X_CAPTCHA_HASH;

use crate::state::AppState;

/// Issue a new captcha challenge.
///
/// The body is the rendered image as a data URL; the challenge key rides
/// in the `x-captcha-hash` header. Generation is retried a few times with
/// a full store flush between attempts before giving up.
pub async fn get_captcha(State(state): State<AppState>) -> Response {
    let retries = state.config.captcha.generation_retries;

    for attempt in 1..=retries {
        match state.captcha.issue(&state.captcha_generator).await {
            Ok(issued) => {
                return (
                    [
                        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                        (HeaderName::from_static(X_CAPTCHA_HASH), issued.hash),
                    ],
                    issued.image_data,
                )
                    .into_response();
            }
            Err(e) => {
                tracing::warn!(attempt, retries, error = %e, "Captcha generation failed");
                state.captcha.clear().await;
            }
        }
    }

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Error generating captcha, please try again later...",
    )
        .into_response()
}
