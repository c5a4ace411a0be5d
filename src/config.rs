//! Booking configuration loaded from environment variables.
//!
//! The auto cutoff threshold is live: every clone of [`BookingSettings`] shares
//! the same value, so a change made through one is seen by the next admission
//! check on any other.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use crate::error::{BookingError, Result};

pub const DEFAULT_AUTO_CUTOFF_PERCENT: u8 = 100;
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_millis(5_000);
pub const DEFAULT_DB_PATH: &str = "freight-booking.db";

#[derive(Debug, Clone)]
pub struct BookingSettings {
    auto_cutoff_percent: Arc<AtomicU8>,
    /// How long an admission waits for a voyage held by another request.
    pub lock_wait: Duration,
    /// Location of the sled database.
    pub db_path: PathBuf,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            auto_cutoff_percent: Arc::new(AtomicU8::new(DEFAULT_AUTO_CUTOFF_PERCENT)),
            lock_wait: DEFAULT_LOCK_WAIT,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl BookingSettings {
    /// Load settings from `BOOKING_*` environment variables with defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`BookingSettings::from_env`] over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let auto_cutoff_percent = lookup("BOOKING_AUTO_CUTOFF_PERCENT")
            .and_then(|s| s.trim().parse::<u8>().ok())
            .filter(|p| *p <= 100)
            .unwrap_or(DEFAULT_AUTO_CUTOFF_PERCENT);

        Self {
            auto_cutoff_percent: Arc::new(AtomicU8::new(auto_cutoff_percent)),
            lock_wait: lookup("BOOKING_LOCK_WAIT_MS")
                .and_then(|s| s.trim().parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_LOCK_WAIT),
            db_path: lookup("BOOKING_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
        }
    }

    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    pub fn with_auto_cutoff_percent(self, percent: u8) -> Result<Self> {
        self.set_auto_cutoff_percent(percent)?;
        Ok(self)
    }

    /// Current threshold; read fresh on every admission.
    pub fn auto_cutoff_percent(&self) -> u8 {
        self.auto_cutoff_percent.load(Ordering::Acquire)
    }

    pub fn set_auto_cutoff_percent(&self, percent: u8) -> Result<()> {
        if percent > 100 {
            return Err(BookingError::BadRequest(format!(
                "Auto cutoff percent must be between 0 and 100, got {percent}"
            )));
        }
        self.auto_cutoff_percent.store(percent, Ordering::Release);
        Ok(())
    }
}
