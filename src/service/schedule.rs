use std::str::FromStr;
use std::time::Duration;

use chrono::Local;
use cron::Schedule;

/// Every ten seconds, on the wall clock.
pub const DEFAULT_INTERVAL_CRON: &str = "*/10 * * * * *";

/// Sleeps until the next occurrence of a cron schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
    schedule: Schedule,
}

impl Ticker {
    pub fn new(schedule: &Schedule) -> Self {
        Self {
            schedule: schedule.clone(),
        }
    }

    pub fn parse(expr: &str) -> Result<Self, cron::error::Error> {
        Ok(Self::new(&Schedule::from_str(expr)?))
    }

    /// Time left until the next occurrence, `None` once the schedule has no
    /// upcoming occurrence.
    pub fn next_delay(&self) -> Option<Duration> {
        let next = self.schedule.upcoming(Local).next()?;
        Some(
            (next - Local::now())
                .to_std()
                .unwrap_or(Duration::ZERO),
        )
    }

    /// Waits for the next occurrence. Returns false when there is none.
    pub async fn tick(&self) -> bool {
        match self.next_delay() {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                true
            }
            None => false,
        }
    }
}
