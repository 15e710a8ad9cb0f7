//! Timer periods for the controller's background tasks

use serde::Deserialize;
use std::time::Duration;

/// Background timer configuration (milliseconds)
#[derive(Debug, Clone, PartialEq)]
pub struct TimingConfig {
    /// Pane redraw period
    pub preview_tick_ms: u64,
    /// Status sweep period; touches every visible session
    pub metadata_tick_ms: u64,
    /// How long a matched menu command stays highlighted
    pub keyup_ms: u64,
    /// Error banner lifetime
    pub error_clear_ms: u64,
    /// Wait between agent start and its first prompt
    pub prompt_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            preview_tick_ms: 100,
            metadata_tick_ms: 500,
            keyup_ms: 500,
            error_clear_ms: 3000,
            prompt_delay_ms: 2000,
        }
    }
}

/// Timing settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileTiming {
    pub preview_tick_ms: Option<u64>,
    pub metadata_tick_ms: Option<u64>,
    pub keyup_ms: Option<u64>,
    pub error_clear_ms: Option<u64>,
    pub prompt_delay_ms: Option<u64>,
}

impl TimingConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileTiming>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        // A zero period would spin the timer loop
        let period = |v: Option<u64>, d: u64| v.filter(|ms| *ms > 0).unwrap_or(d);

        Self {
            preview_tick_ms: period(file.preview_tick_ms, defaults.preview_tick_ms),
            metadata_tick_ms: period(file.metadata_tick_ms, defaults.metadata_tick_ms),
            keyup_ms: period(file.keyup_ms, defaults.keyup_ms),
            error_clear_ms: period(file.error_clear_ms, defaults.error_clear_ms),
            prompt_delay_ms: file.prompt_delay_ms.unwrap_or(defaults.prompt_delay_ms),
        }
    }

    pub fn preview_tick(&self) -> Duration {
        Duration::from_millis(self.preview_tick_ms)
    }

    pub fn metadata_tick(&self) -> Duration {
        Duration::from_millis(self.metadata_tick_ms)
    }

    pub fn keyup(&self) -> Duration {
        Duration::from_millis(self.keyup_ms)
    }

    pub fn error_clear(&self) -> Duration {
        Duration::from_millis(self.error_clear_ms)
    }

    pub fn prompt_delay(&self) -> Duration {
        Duration::from_millis(self.prompt_delay_ms)
    }
}
