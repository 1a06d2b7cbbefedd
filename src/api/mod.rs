mod balance;
mod chain;
mod health;
mod ledger;
mod mining;
pub mod models;
mod stats;
mod wallet;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::validate_chain)
            .service(chain::mine_block)
            .service(chain::get_difficulty)
            .service(chain::set_difficulty)
            .service(mining::start_job)
            .service(mining::get_job)
            .service(mining::cancel_job)
            .service(stats::get_stats)
            .service(ledger::create_coins)
            .service(ledger::submit_tx)
            .service(ledger::check_tx)
            .service(ledger::mine)
            .service(ledger::get_chain)
            .service(ledger::get_pending)
            .service(balance::get_balance)
            .service(balance::get_coins)
            .service(wallet::create_wallet)
            .service(wallet::send),
    );
}
