//! Shared constants for the intake service.

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8081";

/// CAPTCHA challenge expiry (5 minutes)
pub const CAPTCHA_TTL_SECS: u64 = 300;

/// Maximum concurrently outstanding CAPTCHA challenges
pub const CAPTCHA_MAX_OUTSTANDING: usize = 5;

/// Attempts before captcha generation is reported as a server error
pub const CAPTCHA_GENERATION_RETRIES: u32 = 3;

/// Interval between expired-challenge sweeps (seconds)
pub const CAPTCHA_SWEEP_INTERVAL_SECS: u64 = 60;

/// Rendered captcha image dimensions
pub const CAPTCHA_WIDTH: u32 = 500;
pub const CAPTCHA_HEIGHT: u32 = 200;

/// Characters in a captcha answer
pub const CAPTCHA_ANSWER_LEN: usize = 6;

/// Referral IDs reset daily; the counter also wraps at this cap
pub const DAILY_REFERRAL_CAP: u32 = 100;

/// Fixed referral id used by the manual-verification route
pub const TEST_REFERRAL_ID: &str = "99";

/// Bulletin mailbox poll interval (every minute)
pub const BULLETIN_POLL_INTERVAL_SECS: u64 = 60;

/// Implicit-TLS SMTP submission port
pub const SMTPS_PORT: u16 = 465;

/// Implicit-TLS IMAP port
pub const IMAPS_PORT: u16 = 993;

/// Per-request timeout (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Multipart body limit (referral forms carry photos)
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Frontend redirect targets
pub mod pages {
    /// Successful submission, referral id appended as `?refID=`
    pub const REFERRAL_RECEIVED: &str = "../referral_received.html";

    /// Captcha mismatch
    pub const CAPTCHA_FAILED: &str = "../captcha_failed.html";

    /// Generic failure (parse or render error)
    pub const REFERRAL_FAILED: &str = "../referral_failed.html";
}

/// HTTP header names
pub mod headers {
    /// Challenge key returned alongside the captcha image
    pub const X_CAPTCHA_HASH: &str = "x-captcha-hash";
}

/// Well-known file names read at startup
pub mod files {
    /// One recipient address per line; must not be empty
    pub const MAILING_LIST: &str = "mailing-list";

    /// Senders allowed to publish the bulletin; must not be empty
    pub const AUTHORIZED_SENDERS: &str = "motd-authorized-emails";

    /// Handlebars template for the published bulletin fragment
    pub const BULLETIN_TEMPLATE: &str = "templates/motd.hbs";

    /// Published bulletin fragment, written under the assets path
    pub const BULLETIN_OUTPUT: &str = "motd.html";
}
