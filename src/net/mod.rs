//! # Network drivers
//!
//! Async drivers over the synchronous [`Merger`](crate::merger::Merger)
//! core: a UDP ingest loop for station records, a periodic update tick
//! that keeps guard-window expiry moving between datagrams, and the TCP
//! fan-out loop serving live viewers.
//!
//! The merger is shared behind one [`parking_lot::Mutex`]; partitioned
//! locking would buy nothing because every update reads every station.
//! No task ever holds the lock across an await point — packet bytes are
//! copied out under the lock and written to sockets outside it.

use crate::config::Settings;
use crate::error::Result;
use crate::merger::Merger;
use chrono::Utc;
use log::info;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::watch;

/// TCP viewer fan-out loop
pub mod fanout;

/// UDP ingest loop and update tick
pub mod ingest;

/// Current unix timestamp in milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Runs the merger daemon: binds the ingest and viewer sockets, then
/// drives ingest, the update tick and the fan-out until one of them
/// fails with an unrecoverable socket error.
pub async fn serve(settings: Settings) -> Result<()> {
    let merger = Arc::new(Mutex::new(Merger::new(settings.pcr_pid)));
    let (progress_tx, progress_rx) = watch::channel(());
    let progress_tx = Arc::new(progress_tx);

    let udp = UdpSocket::bind(("0.0.0.0", settings.ingest_port)).await?;
    let tcp = TcpListener::bind(("0.0.0.0", settings.viewer_port)).await?;
    info!(
        "merging PCR PID {} from udp/{} to viewers on tcp/{}",
        settings.pcr_pid, settings.ingest_port, settings.viewer_port
    );

    tokio::select! {
        r = ingest::run_ingest(udp, merger.clone(), progress_tx.clone()) => r,
        r = ingest::run_update_tick(merger.clone(), progress_tx) => r,
        r = fanout::run_fanout(tcp, merger, progress_rx, settings) => r,
    }
}
