//! Bulletin ("message of the day") poller.
//!
//! Every tick fetches the newest mailbox message, skips anything already
//! published or from an unauthorized sender, and republishes the sanitized
//! body as a static HTML fragment for the frontend.

mod fetcher;
mod publisher;

pub use fetcher::{CurlFetcher, MailboxFetcher};
pub use publisher::BulletinPublisher;

use anyhow::Result;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Deduplication state, owned by the poller task
#[derive(Debug, Default)]
pub struct BulletinState {
    last_published: Option<String>,
}

impl BulletinState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_published(&self) -> Option<&str> {
        self.last_published.as_deref()
    }
}

/// One poll: fetch the newest message, dedupe by timestamp, authorize the
/// sender, publish. Unauthorized senders are ignored without advancing the
/// published timestamp.
pub async fn poll_once<F: MailboxFetcher>(
    state: &mut BulletinState,
    fetcher: &F,
    publisher: &BulletinPublisher,
    authorized_senders: &[String],
) -> Result<()> {
    let Some(message) = fetcher.fetch_latest().await? else {
        return Ok(());
    };

    if state.last_published.as_deref() == Some(message.timestamp.as_str()) {
        return Ok(());
    }

    if !authorized_senders.iter().any(|s| s == &message.sender) {
        tracing::debug!(sender = %message.sender, "Ignoring bulletin from unauthorized sender");
        return Ok(());
    }

    publisher.publish(&message.body).await?;
    state.last_published = Some(message.timestamp.clone());

    tracing::info!(
        sender = %message.sender,
        timestamp = %message.timestamp,
        "Published new bulletin"
    );

    Ok(())
}

/// Background poller; ticks run sequentially, so a slow fetch delays the
/// next tick instead of overlapping it
pub async fn bulletin_worker<F: MailboxFetcher>(
    fetcher: F,
    publisher: BulletinPublisher,
    authorized_senders: Vec<String>,
    poll_interval: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    tracing::info!(
        interval_secs = poll_interval.as_secs(),
        output = %publisher.output_path().display(),
        "📬 Bulletin poller started"
    );

    let mut state = BulletinState::new();
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = poll_once(&mut state, &fetcher, &publisher, &authorized_senders).await {
                    tracing::error!(error = %e, "Bulletin poll failed");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("📬 Bulletin poller shutting down");
                break;
            }
        }
    }
}
