//! Referral submission handlers.
//!
//! The pipeline is a linear awaited sequence: parse → redeem captcha →
//! assign sequence id → build document → render → fire-and-forget dispatch.
//! Dispatch failures are logged and never affect the response; a render
//! failure short-circuits before any email is attempted.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde_json::Value;

use intake_common::constants::{TEST_REFERRAL_ID, pages};
use intake_common::{Attachment, ReferralFields};

use crate::document::build_referral_document;
use crate::mailer::ReferralEnvelope;
use crate::state::AppState;

struct ParsedSubmission {
    fields: ReferralFields,
    attachments: Vec<Attachment>,
}

/// Accept a referral: verify the captcha, assign a sequence id, render the
/// PDF, and dispatch it to the mailing list
pub async fn submit_referral(State(state): State<AppState>, multipart: Multipart) -> Response {
    let submission = match parse_submission(multipart).await {
        Ok(submission) => submission,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting malformed referral submission");
            return Redirect::to(pages::REFERRAL_FAILED).into_response();
        }
    };

    if !state
        .captcha
        .redeem(
            &submission.fields.captcha_hash,
            &submission.fields.captcha_response,
        )
        .await
    {
        tracing::debug!("Captcha mismatch, rejecting referral");
        return Redirect::to(pages::CAPTCHA_FAILED).into_response();
    }

    let referral_id = state.sequence.next().await;
    let recipients = state.mailing_list.as_ref().clone();

    finish_submission(&state, referral_id, submission, recipients).await
}

/// Manual-verification variant: requires the shared test key and dispatches
/// to a caller-supplied address instead of the mailing list
pub async fn submit_test_referral(State(state): State<AppState>, multipart: Multipart) -> Response {
    let submission = match parse_submission(multipart).await {
        Ok(submission) => submission,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting malformed test submission");
            return Redirect::to(pages::REFERRAL_FAILED).into_response();
        }
    };

    if !state
        .captcha
        .redeem(
            &submission.fields.captcha_hash,
            &submission.fields.captcha_response,
        )
        .await
    {
        return Redirect::to(pages::CAPTCHA_FAILED).into_response();
    }

    if state.config.test_key.is_empty() || submission.fields.test_key != state.config.test_key {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    tracing::info!(test_email = %submission.fields.test_email, "Received test request");

    let recipients = vec![submission.fields.test_email.clone()];
    finish_submission(&state, TEST_REFERRAL_ID.to_string(), submission, recipients).await
}

/// Shared tail of both handlers: render, dispatch, redirect
async fn finish_submission(
    state: &AppState,
    referral_id: String,
    submission: ParsedSubmission,
    mut recipients: Vec<String>,
) -> Response {
    let document = build_referral_document(
        &state.config.referral.clinic_name,
        &referral_id,
        &submission.fields,
        &submission.attachments,
    );

    let renderer = state.renderer.clone();
    let pdf = match tokio::task::spawn_blocking(move || renderer.render(&document)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            tracing::error!(referral_id = %referral_id, error = %e, "Document render failed");
            return Redirect::to(pages::REFERRAL_FAILED).into_response();
        }
        Err(e) => {
            tracing::error!(referral_id = %referral_id, error = %e, "Render task failed");
            return Redirect::to(pages::REFERRAL_FAILED).into_response();
        }
    };

    if submission.fields.wants_doctor_copy() && !submission.fields.doctor_email.is_empty() {
        recipients.push(submission.fields.doctor_email.clone());
    }

    let envelope = ReferralEnvelope {
        referral_id: referral_id.clone(),
        patient_name: submission.fields.patient_name(),
        doctor_name: submission.fields.doctor_name(),
        patient_first: submission.fields.patient_first.clone(),
        patient_last: submission.fields.patient_last.clone(),
        pdf,
        attachments: submission.attachments,
    };

    // Fire-and-forget: dispatch outcomes are logged, never reported back
    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        mailer.dispatch(&recipients, &envelope).await;
    });

    Redirect::to(&format!(
        "{}?refID={}",
        pages::REFERRAL_RECEIVED,
        referral_id
    ))
    .into_response()
}

/// Collect text fields into the form struct and `images` parts into
/// attachment blobs; parts that do not decode as images are skipped
async fn parse_submission(mut multipart: Multipart) -> anyhow::Result<ParsedSubmission> {
    let mut fields = serde_json::Map::new();
    let mut attachments = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "images" || name == "images[]" {
            let file_name = field.file_name().unwrap_or("attachment").to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await?.to_vec();

            if data.is_empty() {
                continue;
            }
            if image::load_from_memory(&data).is_err() {
                tracing::warn!(file_name = %file_name, "Skipping attachment that does not decode as an image");
                continue;
            }

            attachments.push(Attachment {
                file_name,
                content_type,
                data,
            });
        } else if !name.is_empty() {
            fields.insert(name, Value::String(field.text().await?));
        }
    }

    let fields = serde_json::from_value(Value::Object(fields))?;
    Ok(ParsedSubmission {
        fields,
        attachments,
    })
}
