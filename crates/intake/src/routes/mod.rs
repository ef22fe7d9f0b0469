//! HTTP route handlers for the intake service.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use intake_common::constants::{MAX_BODY_BYTES, REQUEST_TIMEOUT_SECS};

use crate::state::AppState;

mod captcha;
mod health;
mod referral;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & status
        .route("/referral/health", get(health::health_check))
        // CAPTCHA issuance
        .route("/referral/captcha", get(captcha::get_captcha))
        // Referral submission
        .route("/referral", post(referral::submit_referral))
        .route("/referral/test", post(referral::submit_test_referral))
        // Layers
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        // Add shared state
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use sha2::{Digest, Sha256};
    use tower::ServiceExt;

    const BOUNDARY: &str = "intake-test-boundary";

    fn test_state(with_mail_credentials: bool) -> AppState {
        let mut config = AppConfig::default();
        config.test_key = "sesame".to_string();
        if with_mail_credentials {
            config.mail.host = "localhost".to_string();
            config.mail.user = "clinic@example.com".to_string();
            config.mail.pass = "secret".to_string();
        }

        AppState::new(config, vec!["intake@example.com".to_string()]).expect("state builds")
    }

    fn multipart_body(fields: &[(&str, &str)]) -> Body {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Body::from(body)
    }

    fn multipart_request(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart_body(fields))
            .expect("request builds")
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[tokio::test]
    async fn health_reports_ok_with_credentials() {
        let state = test_state(true);
        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .uri("/referral/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("handler runs");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("Service is running OK!"));
        assert!(body.contains("intake@example.com"));
    }

    #[tokio::test]
    async fn health_degrades_without_credentials() {
        let state = test_state(false);
        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .uri("/referral/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("handler runs");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_string(response).await;
        assert!(body.contains("Mail credentials not set!"));
    }

    #[tokio::test]
    async fn captcha_route_returns_image_and_hash() {
        let state = test_state(true);
        let response = create_router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/referral/captcha")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("handler runs");

        assert_eq!(response.status(), StatusCode::OK);
        let hash = response
            .headers()
            .get("x-captcha-hash")
            .expect("hash header present")
            .to_str()
            .expect("ascii header")
            .to_string();
        assert_eq!(hash.len(), 64);

        let body = body_string(response).await;
        assert!(body.starts_with("data:image/svg+xml;base64,"));
        assert_eq!(hash, format!("{:x}", Sha256::digest(body.as_bytes())));
        assert_eq!(state.captcha.outstanding().await, 1);
    }

    #[tokio::test]
    async fn valid_submission_redirects_with_referral_id() {
        let state = test_state(true);
        state
            .captcha
            .insert("deadbeef".to_string(), "ab12CD".to_string())
            .await;

        let response = create_router(state)
            .oneshot(multipart_request(
                "/referral",
                &[
                    ("patientFirst", "Jane"),
                    ("patientLast", "Doe"),
                    ("doctorFirst", "Sam"),
                    ("doctorLast", "Lee"),
                    ("captchaHash", "deadbeef"),
                    ("captchaResponse", "ab12CD"),
                ],
            ))
            .await
            .expect("handler runs");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(header::LOCATION)
            .expect("redirect target")
            .to_str()
            .expect("ascii location");

        let id = location
            .strip_prefix("../referral_received.html?refID=")
            .expect("received page with id");
        let (date, suffix) = id.split_once('-').expect("id shape");
        assert_eq!(date.len(), 8);
        assert!(date.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(suffix.len(), 2);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn captcha_mismatch_rejects_without_consuming_a_sequence_id() {
        let state = test_state(true);
        state
            .captcha
            .insert("deadbeef".to_string(), "right".to_string())
            .await;

        let response = create_router(state.clone())
            .oneshot(multipart_request(
                "/referral",
                &[
                    ("patientFirst", "Jane"),
                    ("captchaHash", "deadbeef"),
                    ("captchaResponse", "wrong"),
                ],
            ))
            .await
            .expect("handler runs");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(header::LOCATION)
            .expect("redirect target")
            .to_str()
            .expect("ascii location");
        assert_eq!(location, "../captcha_failed.html");

        // The sequence was never advanced
        let next = state.sequence.next().await;
        assert!(next.ends_with("-00"));
    }

    #[tokio::test]
    async fn second_redemption_of_the_same_hash_fails() {
        let state = test_state(true);
        state
            .captcha
            .insert("deadbeef".to_string(), "ab12CD".to_string())
            .await;

        let fields: &[(&str, &str)] = &[
            ("patientFirst", "Jane"),
            ("patientLast", "Doe"),
            ("captchaHash", "deadbeef"),
            ("captchaResponse", "ab12CD"),
        ];

        let first = create_router(state.clone())
            .oneshot(multipart_request("/referral", fields))
            .await
            .expect("handler runs");
        let first_location = first
            .headers()
            .get(header::LOCATION)
            .expect("redirect target")
            .to_str()
            .expect("ascii location")
            .to_string();
        assert!(first_location.starts_with("../referral_received.html"));

        let second = create_router(state)
            .oneshot(multipart_request("/referral", fields))
            .await
            .expect("handler runs");
        let second_location = second
            .headers()
            .get(header::LOCATION)
            .expect("redirect target")
            .to_str()
            .expect("ascii location");
        assert_eq!(second_location, "../captcha_failed.html");
    }

    #[tokio::test]
    async fn test_route_requires_the_shared_key() {
        let state = test_state(true);
        state
            .captcha
            .insert("deadbeef".to_string(), "ab12CD".to_string())
            .await;

        let response = create_router(state)
            .oneshot(multipart_request(
                "/referral/test",
                &[
                    ("captchaHash", "deadbeef"),
                    ("captchaResponse", "ab12CD"),
                    ("testKey", "not-the-key"),
                    ("testEmail", "qa@example.com"),
                ],
            ))
            .await
            .expect("handler runs");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_route_uses_the_fixed_test_id() {
        let state = test_state(true);
        state
            .captcha
            .insert("deadbeef".to_string(), "ab12CD".to_string())
            .await;

        let response = create_router(state)
            .oneshot(multipart_request(
                "/referral/test",
                &[
                    ("patientFirst", "Jane"),
                    ("captchaHash", "deadbeef"),
                    ("captchaResponse", "ab12CD"),
                    ("testKey", "sesame"),
                    ("testEmail", "qa@example.com"),
                ],
            ))
            .await
            .expect("handler runs");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(header::LOCATION)
            .expect("redirect target")
            .to_str()
            .expect("ascii location");
        assert_eq!(location, "../referral_received.html?refID=99");
    }
}
