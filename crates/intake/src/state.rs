//! Application state and shared resources.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use intake_common::constants::{CAPTCHA_HEIGHT, CAPTCHA_WIDTH};

use crate::captcha::{CaptchaGenerator, CaptchaStore};
use crate::config::AppConfig;
use crate::document::render::PdfRenderer;
use crate::mailer::SmtpMailer;
use crate::sequence::ReferralSequence;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Outstanding captcha challenges (single-use, TTL-bounded)
    pub captcha: Arc<CaptchaStore>,

    /// CAPTCHA image generator
    pub captcha_generator: Arc<CaptchaGenerator>,

    /// Daily-resetting referral sequence
    pub sequence: Arc<ReferralSequence>,

    /// PDF document renderer
    pub renderer: Arc<PdfRenderer>,

    /// Outbound SMTP dispatcher
    pub mailer: Arc<SmtpMailer>,

    /// Referral recipients, loaded at startup
    pub mailing_list: Arc<Vec<String>>,
}

impl AppState {
    /// Create new application state from configuration
    pub fn new(config: AppConfig, mailing_list: Vec<String>) -> Result<Self> {
        let mailer = Arc::new(SmtpMailer::new(&config.mail)?);

        let captcha = Arc::new(CaptchaStore::new(
            Duration::from_secs(config.captcha.ttl_secs),
            config.captcha.max_outstanding,
        ));
        let captcha_generator = Arc::new(CaptchaGenerator::new(CAPTCHA_WIDTH, CAPTCHA_HEIGHT));
        let sequence = Arc::new(ReferralSequence::new(config.referral.daily_cap));
        let renderer = Arc::new(PdfRenderer::new());

        Ok(Self {
            config,
            captcha,
            captcha_generator,
            sequence,
            renderer,
            mailer,
            mailing_list: Arc::new(mailing_list),
        })
    }
}
