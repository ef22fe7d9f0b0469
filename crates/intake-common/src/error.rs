//! Common error types for the intake service.

use thiserror::Error;

/// Errors raised at the service seams (captcha, rendering, dispatch).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// CAPTCHA generation error
    #[error("CAPTCHA error: {0}")]
    Captcha(String),

    /// Document rendering error
    #[error("Render error: {0}")]
    Render(String),

    /// Outbound mail dispatch error
    #[error("Mail error: {0}")]
    Mail(String),

    /// Mailbox fetch error (bulletin poller)
    #[error("Mailbox error: {0}")]
    Mailbox(String),

    /// Invalid input/request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Captcha(_) => 500,
            Self::Render(_) => 500,
            Self::Mail(_) => 502,
            Self::Mailbox(_) => 502,
            Self::InvalidInput(_) => 400,
            Self::Internal(_) => 500,
        }
    }
}
