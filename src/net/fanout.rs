use crate::config::Settings;
use crate::error::{Result, TsMergeError};
use crate::merger::{ChainLink, Merger};
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::time;

/// Accepts viewer connections and serves each from its own task.
///
/// Viewer slots are bounded; a connection arriving at capacity is
/// dropped immediately. Each viewer receives the merged output as
/// back-to-back 188-byte TS packets with no further framing.
pub async fn run_fanout(
    listener: TcpListener,
    merger: Arc<Mutex<Merger>>,
    progress: watch::Receiver<()>,
    settings: Settings,
) -> Result<()> {
    let slots = Arc::new(Semaphore::new(settings.max_viewers));
    let idle_timeout = Duration::from_millis(settings.viewer_timeout_ms);

    loop {
        let (stream, peer) = listener.accept().await?;

        let Ok(permit) = slots.clone().try_acquire_owned() else {
            info!("viewer {} rejected: all viewer slots in use", peer);
            continue;
        };

        info!("new viewer connection from {}", peer);
        let merger = merger.clone();
        let progress = progress.clone();

        tokio::spawn(async move {
            if let Err(e) = serve_viewer(stream, merger, progress, idle_timeout).await {
                debug!("viewer {}: {}", peer, e);
            }
            info!("closing viewer connection from {}", peer);
            drop(permit);
        });
    }
}

/// Streams the output chain to one viewer until it disconnects, sends
/// anything, stalls, or goes idle past the timeout.
///
/// The viewer's position on the chain is its last-delivered packet; the
/// merger re-anchors a position that has been evicted. Packet bytes are
/// copied out under the merger lock and written outside it.
async fn serve_viewer(
    stream: TcpStream,
    merger: Arc<Mutex<Merger>>,
    mut progress: watch::Receiver<()>,
    idle_timeout: Duration,
) -> Result<()> {
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();

    let mut last: Option<ChainLink> = None;
    let mut last_delivery = time::Instant::now();
    let mut inbound = [0u8; 64];

    loop {
        // Drain everything currently deliverable.
        loop {
            let packet = {
                let merger = merger.lock();
                merger.next(last).map(|p| (*p.raw(), p.link()))
            };
            let Some((raw, link)) = packet else {
                break;
            };

            match time::timeout(idle_timeout, writer.write_all(&raw)).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(TsMergeError::Protocol("viewer write stalled".into()));
                }
            }
            last = link;
            last_delivery = time::Instant::now();
        }

        // Nothing deliverable: wait for merge progress. Any inbound
        // bytes (or the peer closing) end the session, as does an idle
        // period with no delivered packet.
        tokio::select! {
            changed = progress.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = reader.read(&mut inbound) => {
                return Ok(());
            }
            _ = time::sleep_until(last_delivery + idle_timeout) => {
                return Err(TsMergeError::Protocol("viewer idle timeout".into()));
            }
        }
    }
}
