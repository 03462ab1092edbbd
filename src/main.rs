use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use pglure::server::{CredentialSink, Server, TracingSink};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "pglure",
    about = "PostgreSQL decoy that records the credentials clients offer",
    version
)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:5432")]
    addr: String,

    /// Pause between listen cycles, in milliseconds
    #[arg(long = "break-time", default_value_t = 1000, value_name = "MS")]
    break_time: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let sink: Arc<dyn CredentialSink> = Arc::new(TracingSink);
    let break_time = Duration::from_millis(args.break_time);

    // Each cycle ends after one capture (or on failure); listen again after a pause
    loop {
        match Server::bind(&args.addr, sink.clone()).await {
            Ok(server) => match server.serve().await {
                Ok(()) => info!(addr = %args.addr, "listen cycle finished"),
                Err(e) => error!(error = %e, "loop done"),
            },
            Err(e) => error!(addr = %args.addr, error = %e, "loop done"),
        }
        tokio::time::sleep(break_time).await;
    }
}
