mod api;
mod blockchain;
mod config;
mod encoding;
mod error;
mod ledger;
mod transaction;
mod wallet;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;
use std::io;

use api::AppState;
use blockchain::{Blockchain, CancelToken};
use config::Config;
use ledger::Ledger;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let blockchain = Blockchain::new(&config.chain, &CancelToken::new())
        .map_err(io::Error::other)?;
    let ledger = Ledger::default();
    info!(
        "ledger authority {} (bits={:#010x}, target={}s, window={})",
        ledger.authority_address(),
        config.chain.initial_bits,
        config.chain.target_block_time.as_secs(),
        config.chain.retarget_window
    );

    println!(
        "⛓️ Starting blockchain API at http://{}:{}",
        config.host, config.port
    );

    let state = web::Data::new(AppState::new(blockchain, ledger));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
