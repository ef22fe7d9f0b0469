//! Mailbox access for the bulletin poller.

use anyhow::{Context, Result};
use std::future::Future;
use tokio::process::Command;

use intake_common::BulletinMessage;
use intake_common::constants::IMAPS_PORT;

use crate::config::BulletinConfig;

/// Transport seam: fetch the newest mailbox message, if any
pub trait MailboxFetcher {
    fn fetch_latest(&self) -> impl Future<Output = Result<Option<BulletinMessage>>> + Send;
}

/// Fetches the newest INBOX message over IMAP by shelling out to `curl`
pub struct CurlFetcher {
    host: String,
    user: String,
    pass: String,
}

impl CurlFetcher {
    pub fn new(config: &BulletinConfig) -> Self {
        Self {
            host: config.host.clone(),
            user: config.user.clone(),
            pass: config.pass.clone(),
        }
    }
}

impl MailboxFetcher for CurlFetcher {
    async fn fetch_latest(&self) -> Result<Option<BulletinMessage>> {
        let base = format!("imaps://{}:{}/INBOX", self.host, IMAPS_PORT);

        let output = Command::new("curl")
            .arg("-s")
            .arg("--url")
            .arg(format!("{base};UID=*;SECTION=HEADER.FIELDS%20(DATE%20FROM)"))
            .arg("--url")
            .arg(format!("{base};UID=*;SECTION=TEXT"))
            .arg("-u")
            .arg(format!("{}:{}", self.user, self.pass))
            .output()
            .await
            .context("failed to run curl")?;

        if !output.status.success() {
            anyhow::bail!(
                "curl exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(parse_fetch_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse the concatenated header + text sections into a message.
/// Returns None when either the Date or From header is missing.
pub(crate) fn parse_fetch_output(raw: &str) -> Option<BulletinMessage> {
    let mut timestamp = None;
    let mut sender = None;
    let mut body = Vec::new();

    for line in raw.lines() {
        let line = line.trim_end();
        if timestamp.is_none() && line.starts_with("Date:") {
            timestamp = Some(line["Date:".len()..].trim().to_string());
        } else if sender.is_none() && line.starts_with("From:") {
            sender = Some(parse_sender(line["From:".len()..].trim()));
        } else if !line.is_empty() {
            body.push(line);
        }
    }

    Some(BulletinMessage {
        sender: sender?,
        timestamp: timestamp?,
        body: body.join("\n"),
    })
}

/// Extract the bare address from `Display Name <user@host>` or `user@host`
pub(crate) fn parse_sender(raw: &str) -> String {
    match (raw.find('<'), raw.rfind('>')) {
        (Some(start), Some(end)) if start < end => raw[start + 1..end].trim().to_string(),
        _ => raw.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_is_stripped_to_the_bare_address() {
        assert_eq!(parse_sender("Dr. Lee <lee@example.com>"), "lee@example.com");
        assert_eq!(parse_sender("lee@example.com"), "lee@example.com");
        assert_eq!(parse_sender("  lee@example.com  "), "lee@example.com");
    }

    #[test]
    fn output_parses_into_message_parts() {
        let raw = "Date: Mon, 10 Mar 2025 09:00:00 +0000\r\n\
                   From: Clinic Admin <admin@example.com>\r\n\
                   \r\n\
                   Walk-in hours are extended this week.\r\n\
                   See the front desk for details.\r\n";

        let message = parse_fetch_output(raw).expect("parsable output");
        assert_eq!(message.timestamp, "Mon, 10 Mar 2025 09:00:00 +0000");
        assert_eq!(message.sender, "admin@example.com");
        assert_eq!(
            message.body,
            "Walk-in hours are extended this week.\nSee the front desk for details."
        );
    }

    #[test]
    fn missing_headers_yield_no_message() {
        assert!(parse_fetch_output("just a body with no headers").is_none());
        assert!(parse_fetch_output("").is_none());
    }
}
