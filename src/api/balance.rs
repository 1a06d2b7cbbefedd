use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, BalanceResponse, CoinsResponse};

#[get("/balance/{address}/")]
pub async fn get_balance(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let address = path.into_inner().0;

    let (balance, coins) = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        (
            ledger.balance(&address),
            ledger.receiving_events(&address).len(),
        )
    };

    HttpResponse::Ok().json(BalanceResponse {
        address,
        balance,
        coins,
    })
}

/// Every coin the address has received, spendable or not.
#[get("/coins/{address}/")]
pub async fn get_coins(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let address = path.into_inner().0;
    let coins = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.receiving_events(&address)
    };
    HttpResponse::Ok().json(CoinsResponse { address, coins })
}
