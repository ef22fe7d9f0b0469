//! Daily-resetting referral sequence identifiers.
//!
//! IDs look like `20250806-07`: the local date plus a zero-padded counter
//! that starts over each calendar day, or after the daily cap is reached.

use chrono::{DateTime, Datelike, Local};
use tokio::sync::Mutex;

/// Referral sequence generator; the counter state is a process-wide
/// singleton guarded by a mutex
pub struct ReferralSequence {
    daily_cap: u32,
    state: Mutex<SequenceState>,
}

#[derive(Debug)]
struct SequenceState {
    day: u32,
    index: u32,
}

impl ReferralSequence {
    pub fn new(daily_cap: u32) -> Self {
        Self {
            daily_cap,
            state: Mutex::new(SequenceState {
                day: Local::now().day(),
                index: 0,
            }),
        }
    }

    /// Next referral id, `YYYYMMDD-NN`
    pub async fn next(&self) -> String {
        self.next_at(Local::now()).await
    }

    async fn next_at(&self, now: DateTime<Local>) -> String {
        let mut state = self.state.lock().await;

        if state.day != now.day() || state.index >= self.daily_cap {
            state.day = now.day();
            state.index = 0;
        }

        let id = format!("{}-{:02}", now.format("%Y%m%d"), state.index);
        state.index += 1;
        id
    }
}
