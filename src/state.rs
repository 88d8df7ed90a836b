use chrono::{Local, Utc};

#[derive(Clone, Debug)]
pub struct Config {
    pub agent_base: String,
    pub tick_ms: u64,
    pub hard_stop_ms: u64,
    pub command_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            agent_base: std::env::var("AGENT_BASE").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string()),
            tick_ms: std::env::var("TICK_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(2000),
            hard_stop_ms: std::env::var("HARD_STOP_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(20000),
            command_delay_ms: std::env::var("COMMAND_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(1500),
        }
    }
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Wall-clock time as HH:MM:SS, the form session entries carry.
pub fn clock_time() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
