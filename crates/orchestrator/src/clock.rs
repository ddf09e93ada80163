//! Wall-clock access and the awake-hours window.

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use chrono_tz::Tz;
use tokio::time::Instant;

/// Source of wall-clock time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock driven by tokio's timer.
///
/// Reports `anchor + elapsed`, where elapsed is measured with
/// [`tokio::time::Instant`]. Under a paused runtime, `tokio::time::advance`
/// moves this clock forward too.
#[derive(Debug, Clone)]
pub struct TokioClock {
    wall: DateTime<Utc>,
    started: Instant,
}

impl TokioClock {
    pub fn starting_at(wall: DateTime<Utc>) -> Self {
        Self {
            wall,
            started: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = ChronoDuration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| ChronoDuration::zero());
        self.wall + elapsed
    }
}

/// Local hours during which the assistant may nudge or call.
///
/// `start_hour` is inclusive, `end_hour` exclusive. A window whose start is
/// after its end wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwakeWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    pub timezone: Tz,
}

impl AwakeWindow {
    pub fn new(start_hour: u32, end_hour: u32, timezone: Tz) -> Self {
        Self {
            start_hour,
            end_hour,
            timezone,
        }
    }

    /// Whether `at` falls inside the window in local time.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let hour = at.with_timezone(&self.timezone).hour();
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

impl Default for AwakeWindow {
    fn default() -> Self {
        Self::new(7, 23, chrono_tz::America::New_York)
    }
}
