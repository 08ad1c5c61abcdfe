use anyhow::Context;
use axum::{routing::get, Router};
use clap::Parser;
use rand::seq::SliceRandom;
use std::net::{IpAddr, UdpSocket};
use tracing::info;

mod config;
mod derange;
mod engine;
mod error;
mod identity;
mod lobby;
mod outbox;
mod phase;
mod registry;
mod ws;

use config::Config;
use engine::Engine;
use ws::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sketchparty_server=info".into()),
        )
        .with_target(false)
        .init();

    let config = Config::parse();
    let state = AppState {
        engine: Engine::new(config.engine()).shared(),
        keepalive: config.keepalive(),
    };
    let app = Router::new()
        .route("/", get(greeting))
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("server listening on ws://{addr}/ws");
    if let Some(ip) = lan_ip() {
        info!("LAN address: {ip}:{}", config.port);
    }
    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}

async fn greeting() -> String {
    let hello = ["Hey there!", "Howdy", "Yo!", "Ayo!", "Greetings"]
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Hello");
    format!("{hello} you know this is just a websocket server, there is no actual web to this?")
}

// Route-lookup trick: connecting a UDP socket sends nothing.
fn lan_ip() -> Option<IpAddr> {
    let sock = UdpSocket::bind("0.0.0.0:0").ok()?;
    sock.connect("8.8.8.8:80").ok()?;
    Some(sock.local_addr().ok()?.ip())
}
