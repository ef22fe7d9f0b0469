//! Configuration management for the intake service.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;

use intake_common::constants::{
    BULLETIN_POLL_INTERVAL_SECS, CAPTCHA_GENERATION_RETRIES, CAPTCHA_MAX_OUTSTANDING,
    CAPTCHA_TTL_SECS, DAILY_REFERRAL_CAP, DEFAULT_LISTEN_ADDR, files,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Shared secret for the manual-verification route
    #[serde(default)]
    pub test_key: String,

    /// Outbound SMTP settings
    #[serde(default)]
    pub mail: MailConfig,

    /// CAPTCHA configuration
    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// Referral intake configuration
    #[serde(default)]
    pub referral: ReferralConfig,

    /// Bulletin poller configuration
    #[serde(default)]
    pub bulletin: BulletinConfig,
}

/// Outbound SMTP credentials; missing values are surfaced by the health
/// endpoint rather than failing startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub host: String,
    pub user: String,
    pub pass: String,
}

/// CAPTCHA-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    /// Challenge validity in seconds
    #[serde(default = "default_captcha_ttl")]
    pub ttl_secs: u64,

    /// Outstanding-challenge bound; the oldest challenge is evicted beyond it
    #[serde(default = "default_max_outstanding")]
    pub max_outstanding: usize,

    /// Generation attempts before answering with a server error
    #[serde(default = "default_generation_retries")]
    pub generation_retries: u32,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_captcha_ttl(),
            max_outstanding: default_max_outstanding(),
            generation_retries: default_generation_retries(),
        }
    }
}

/// Referral intake configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReferralConfig {
    /// Recipient list file, one address per line
    #[serde(default = "default_mailing_list_path")]
    pub mailing_list_path: String,

    /// Sequence counter wraps after this many referrals per day
    #[serde(default = "default_daily_cap")]
    pub daily_cap: u32,

    /// Clinic name printed on the rendered document
    #[serde(default = "default_clinic_name")]
    pub clinic_name: String,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            mailing_list_path: default_mailing_list_path(),
            daily_cap: default_daily_cap(),
            clinic_name: default_clinic_name(),
        }
    }
}

/// Bulletin poller configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BulletinConfig {
    /// IMAP mailbox host
    #[serde(default)]
    pub host: String,

    /// Mailbox login
    #[serde(default)]
    pub user: String,

    /// Mailbox password
    #[serde(default)]
    pub pass: String,

    /// Allow-list file, one sender per line
    #[serde(default = "default_authorized_senders_path")]
    pub authorized_senders_path: String,

    /// Handlebars template for the published fragment
    #[serde(default = "default_template_path")]
    pub template_path: String,

    /// Directory the rendered fragment is written into
    #[serde(default = "default_assets_path")]
    pub assets_path: String,

    /// File name of the rendered fragment
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Mailbox poll interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for BulletinConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: String::new(),
            pass: String::new(),
            authorized_senders_path: default_authorized_senders_path(),
            template_path: default_template_path(),
            assets_path: default_assets_path(),
            output_file: default_output_file(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_captcha_ttl() -> u64 { CAPTCHA_TTL_SECS }
fn default_max_outstanding() -> usize { CAPTCHA_MAX_OUTSTANDING }
fn default_generation_retries() -> u32 { CAPTCHA_GENERATION_RETRIES }
fn default_mailing_list_path() -> String { files::MAILING_LIST.to_string() }
fn default_daily_cap() -> u32 { DAILY_REFERRAL_CAP }
fn default_clinic_name() -> String { "Community Clinic".to_string() }
fn default_authorized_senders_path() -> String { files::AUTHORIZED_SENDERS.to_string() }
fn default_template_path() -> String { files::BULLETIN_TEMPLATE.to_string() }
fn default_assets_path() -> String { "public".to_string() }
fn default_output_file() -> String { files::BULLETIN_OUTPUT.to_string() }
fn default_poll_interval() -> u64 { BULLETIN_POLL_INTERVAL_SECS }

impl AppConfig {
    /// Load configuration from file, with environment and CLI overrides
    pub fn load(config_path: &str, args: &crate::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();

        // Apply CLI overrides
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }

        Ok(config)
    }

    /// Deployments configure credentials through flat environment variables;
    /// a non-empty variable wins over the file value.
    fn apply_env_overrides(&mut self) {
        override_from_env("MAIL_HOST", &mut self.mail.host);
        override_from_env("MAIL_USER", &mut self.mail.user);
        override_from_env("MAIL_PASS", &mut self.mail.pass);
        override_from_env("TEST_KEY", &mut self.test_key);
        override_from_env("MOTD_HOST", &mut self.bulletin.host);
        override_from_env("MOTD_USER", &mut self.bulletin.user);
        override_from_env("MOTD_PASS", &mut self.bulletin.pass);
        override_from_env("FRONTEND_ASSETS_PATH", &mut self.bulletin.assets_path);
    }
}

fn override_from_env(var: &str, target: &mut String) {
    if let Ok(value) = env::var(var) {
        if !value.is_empty() {
            *target = value;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            test_key: String::new(),
            mail: MailConfig::default(),
            captcha: CaptchaConfig::default(),
            referral: ReferralConfig::default(),
            bulletin: BulletinConfig::default(),
        }
    }
}

/// Read a one-entry-per-line list file (mailing list, bulletin allow-list).
/// A missing or empty file is a startup error.
pub fn read_list_file(path: &str) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {path}: please ensure the file is present"))?;

    let entries: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if entries.is_empty() {
        anyhow::bail!("{path} must contain at least 1 email!");
    }

    Ok(entries)
}
