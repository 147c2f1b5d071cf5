//! Runtime settings for the merger daemon.
//!
//! Defaults match the reference deployment (UDP 5678 in, TCP 5679 out,
//! PCR clock on PID 256). Environment variables override the defaults
//! and CLI flags override both. Core table sizes and timeouts are
//! compile-time constants in [`merger`](crate::merger); they are part of
//! the memory layout, not configuration.

use std::env;

/// Settings for the merger daemon.
#[derive(Debug, Clone)]
pub struct Settings {
    /// UDP port stations send ingest records to
    pub ingest_port: u16,
    /// TCP port viewers connect to
    pub viewer_port: u16,
    /// The PID carrying the PCR clock
    pub pcr_pid: u16,
    /// Maximum number of concurrent viewers
    pub max_viewers: usize,
    /// A viewer with nothing deliverable or a stalled socket for this
    /// long is disconnected
    pub viewer_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ingest_port: 5678,
            viewer_port: 5679,
            pcr_pid: 256,
            max_viewers: 10,
            viewer_timeout_ms: 60_000,
        }
    }
}

impl Settings {
    /// Builds settings from defaults overridden by `TSMERGE_*`
    /// environment variables. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Some(port) = env_parse("TSMERGE_INGEST_PORT") {
            settings.ingest_port = port;
        }
        if let Some(port) = env_parse("TSMERGE_VIEWER_PORT") {
            settings.viewer_port = port;
        }
        if let Some(pid) = env_parse("TSMERGE_PCR_PID") {
            settings.pcr_pid = pid;
        }

        settings
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
