use crate::error::Result;
use crate::format::mx::MX_RECORD_LEN;
use crate::merger::Merger;
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time;

/// Receive buffer for ingest datagrams
const RECV_BUFFER: usize = 65_536;

/// How often the merger is ticked when no datagrams arrive, so segments
/// leaving the guard window still publish promptly
const UPDATE_TICK: Duration = Duration::from_millis(10);

/// Receives station datagrams and feeds them into the merger.
///
/// A datagram carries one or more 204-byte records back-to-back; one
/// whose length is zero or not a multiple of 204 is dropped whole. All
/// records of a datagram share one receive timestamp. After feeding,
/// the merger is updated until it reports no further progress and
/// viewers are woken if anything published.
pub async fn run_ingest(
    socket: UdpSocket,
    merger: Arc<Mutex<Merger>>,
    progress: Arc<watch::Sender<()>>,
) -> Result<()> {
    let mut buf = vec![0u8; RECV_BUFFER];

    loop {
        let (len, peer) = socket.recv_from(&mut buf).await?;
        let now = super::now_ms();

        if len == 0 || len % MX_RECORD_LEN != 0 {
            warn!(
                "dropping datagram from {}: {} bytes is not a positive multiple of {}",
                peer, len, MX_RECORD_LEN
            );
            continue;
        }

        let published = {
            let mut merger = merger.lock();
            for record in buf[..len].chunks_exact(MX_RECORD_LEN) {
                if let Err(e) = merger.feed(now, record) {
                    debug!("dropped record from {}: {}", peer, e);
                }
            }
            drive_updates(&mut merger, now)
        };

        if published {
            let _ = progress.send(());
        }
    }
}

/// Ticks the merger on a fixed cadence.
///
/// Segment boundaries become eligible only once they age past the guard
/// window; without a tick that could only ever happen on the next
/// datagram.
pub async fn run_update_tick(
    merger: Arc<Mutex<Merger>>,
    progress: Arc<watch::Sender<()>>,
) -> Result<()> {
    let mut interval = time::interval(UPDATE_TICK);

    loop {
        interval.tick().await;
        let now = super::now_ms();

        let published = {
            let mut merger = merger.lock();
            drive_updates(&mut merger, now)
        };

        if published {
            let _ = progress.send(());
        }
    }
}

/// Updates until no more segments publish; true if any did.
fn drive_updates(merger: &mut Merger, now_ms: i64) -> bool {
    let mut published = false;
    while merger.update(now_ms) {
        published = true;
    }
    published
}
