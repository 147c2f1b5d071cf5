use clap::Parser;
use log::error;
use tsmerge::config::Settings;
use tsmerge::net;

#[derive(Parser)]
#[command(name = "tsmerge")]
#[command(version)]
#[command(about = "Merges redundant MPEG-TS station feeds into one coherent stream for live TCP viewers", long_about = None)]
struct Args {
    /// UDP port to receive station records on
    #[arg(long)]
    ingest_port: Option<u16>,

    /// TCP port viewers connect to
    #[arg(long)]
    viewer_port: Option<u16>,

    /// PID carrying the PCR clock
    #[arg(long)]
    pcr_pid: Option<u16>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut settings = Settings::from_env();
    if let Some(port) = args.ingest_port {
        settings.ingest_port = port;
    }
    if let Some(port) = args.viewer_port {
        settings.viewer_port = port;
    }
    if let Some(pid) = args.pcr_pid {
        settings.pcr_pid = pid;
    }

    if let Err(e) = net::serve(settings).await {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
