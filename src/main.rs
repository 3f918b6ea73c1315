mod api;
mod blockchain;
mod config;
mod error;
mod events;
mod peer;
mod state;

use std::io;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::{debug, info};
use tokio::net::TcpListener;

use blockchain::{Block, ChainStore};
use config::Settings;
use state::AppState;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let settings =
        Settings::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // genesis goes in before any listener is bound
    let genesis = Block::genesis();
    debug!("genesis block: {genesis:#?}");
    let state = AppState::new(
        ChainStore::new(genesis, settings.difficulty),
        settings.mining_throttle,
    );
    tokio::spawn(events::run_dump(state.updates.subscribe()));

    if let Some(tcp_port) = settings.tcp_port {
        let listener = TcpListener::bind((settings.host.as_str(), tcp_port)).await?;
        info!("peer listener on {}", listener.local_addr()?);
        tokio::spawn(peer::serve(
            listener,
            state.clone(),
            settings.broadcast_interval,
        ));
    }

    let Settings {
        host, http_port, ..
    } = settings;
    println!(
        "⛓️ Starting BPM chain API at http://{host}:{http_port} (difficulty {})",
        state.factory.difficulty()
    );

    let state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((host.as_str(), http_port))?
    .run()
    .await
}
