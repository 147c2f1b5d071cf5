use bytes::BytesMut;
use clap::{Parser, ValueEnum};
use log::warn;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::UdpSocket;
use tsmerge::format::mx::{write_record, Callsign};
use tsmerge::format::ts::{parse_header, TS_NULL_PID, TS_PACKET_SIZE, TS_SYNC_BYTE};

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Framed records for a tsmerge merger
    Mx,
    /// Bare TS packets
    Ts,
}

#[derive(Parser)]
#[command(name = "tspush")]
#[command(version)]
#[command(about = "Relays a TS stream to a tsmerge merger over UDP", long_about = None)]
struct Args {
    /// Hostname to send data to
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port number to send data to
    #[arg(short, long, default_value_t = 5678)]
    port: u16,

    /// Station callsign, up to 10 characters. Required in mx mode
    #[arg(short, long)]
    callsign: Option<String>,

    /// Send framed records for the merger, or bare TS packets
    #[arg(short, long, value_enum, default_value = "mx")]
    mode: Mode,

    /// Input TS file; reads stdin when omitted
    input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let callsign: Option<Callsign> = match (&args.mode, &args.callsign) {
        (Mode::Mx, Some(callsign)) => Some(callsign.parse()?),
        (Mode::Mx, None) => {
            return Err("a callsign is required in mx mode".into());
        }
        (Mode::Ts, _) => None,
    };

    let mut reader: Box<dyn AsyncRead + Unpin> = match &args.input {
        Some(path) => Box::new(File::open(path).await?),
        None => Box::new(tokio::io::stdin()),
    };

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect((args.host.as_str(), args.port)).await?;

    let mut packet = [0u8; TS_PACKET_SIZE];
    let mut record = BytesMut::with_capacity(TS_PACKET_SIZE + 16);
    let mut counter: u32 = 0;

    loop {
        match reader.read_exact(&mut packet).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        if packet[0] != TS_SYNC_BYTE {
            // Slipped input: re-align to the next sync byte and refill.
            let Some(pos) = packet.iter().position(|&b| b == TS_SYNC_BYTE) else {
                continue;
            };
            packet.copy_within(pos.., 0);
            match reader.read_exact(&mut packet[TS_PACKET_SIZE - pos..]).await {
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
        }

        let header = match parse_header(&packet) {
            Ok(header) => header,
            Err(e) => {
                warn!("skipping invalid TS packet: {}", e);
                continue;
            }
        };

        // NULL/padding packets carry nothing worth relaying.
        if header.pid == TS_NULL_PID {
            continue;
        }

        match callsign {
            Some(ref callsign) => {
                record.clear();
                write_record(&mut record, counter, callsign, &packet);
                socket.send(&record).await?;
            }
            None => {
                socket.send(&packet).await?;
            }
        }

        counter = counter.wrapping_add(1);
    }

    Ok(())
}
