//! Binary entry point: installs the `tracing` subscriber and drives the
//! event loop. The library crate never installs a subscriber itself (spec
//! §10.1) so it stays usable as a dependency of a different front end, e.g.
//! the monitor-only operator CLI.

use std::net::SocketAddr;

use arpanet_host::ncp::NcpConfig;
use arpanet_host::{Config, EventLoop};

fn install_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::io::Result<()> {
    install_logging();

    let imp_local_addr: SocketAddr = std::env::var("ARPANET_HOST_LOCAL")
        .unwrap_or_else(|_| "127.0.0.1:20051".to_string())
        .parse()
        .expect("ARPANET_HOST_LOCAL must be a valid socket address");
    let imp_peer_addr: SocketAddr = std::env::var("ARPANET_HOST_PEER")
        .unwrap_or_else(|_| "127.0.0.1:20052".to_string())
        .parse()
        .expect("ARPANET_HOST_PEER must be a valid socket address");
    let console_addr: Option<SocketAddr> = std::env::var("ARPANET_HOST_CONSOLE")
        .ok()
        .map(|s| s.parse().expect("ARPANET_HOST_CONSOLE must be a valid socket address"));

    let config = Config {
        imp_local_addr,
        imp_peer_addr,
        console_addr,
        ncp: NcpConfig::default(),
    };

    tracing::info!(%imp_local_addr, %imp_peer_addr, ?console_addr, "starting ARPANET host process");

    let mut event_loop = EventLoop::new(config).await?;
    event_loop.run().await
}
