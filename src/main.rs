//! Server binary: configuration, logging, and the HTTP front door.

use std::net::SocketAddr;
use std::sync::Arc;

use dealgate::server::AppState;
use dealgate::{Gateway, GatewayConfig, create_router};

const DEFAULT_PORT: u16 = 3005;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = GatewayConfig::from_env()?;
    log::info!(
        "starting dealgate {} ({} transport, {} proxy mode)",
        dealgate::VERSION,
        match config.transport {
            dealgate::TransportKind::Direct => "direct",
            dealgate::TransportKind::Rendering => "rendering",
        },
        match &config.proxy_mode {
            dealgate::ProxyModeConfig::Discovery { .. } => "discovery",
            dealgate::ProxyModeConfig::FixedUpstream(_) => "fixed-upstream",
        },
    );

    let gateway = Arc::new(Gateway::from_config(config)?);
    let state = AppState::new(gateway);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("listening on {addr}");

    axum::serve(
        listener,
        create_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
