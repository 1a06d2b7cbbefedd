use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, warn};

use super::models::{
    AppState, CheckTxResponse, CreateCoinsRequest, LedgerChainResponse, PendingResponse,
    SubmitTxRequest, SubmitTxResponse,
};
use crate::wallet::parse_public_key_hex;

/// Authority mint into the pending set.
#[post("/ledger/coins/")]
pub async fn create_coins(
    state: web::Data<AppState>,
    body: web::Json<CreateCoinsRequest>,
) -> impl Responder {
    let receivers = body.into_inner().receivers;
    if receivers.is_empty() {
        return HttpResponse::BadRequest().body("receivers required");
    }
    let mut ledger = state.ledger.lock().expect("mutex poisoned");
    let tx = ledger.create_coins(receivers);
    HttpResponse::Ok().json(tx)
}

/// Submit a signed transaction. A rejected one is discarded and the
/// reason returned with 409.
#[post("/ledger/tx/")]
pub async fn submit_tx(
    state: web::Data<AppState>,
    body: web::Json<SubmitTxRequest>,
) -> impl Responder {
    let SubmitTxRequest {
        transaction,
        public_key,
    } = body.into_inner();
    debug!("POST /ledger/tx/ - received tx {}", transaction.hash);

    let signer = match parse_public_key_hex(&public_key) {
        Ok(pk) => pk,
        Err(e) => {
            warn!("POST /ledger/tx/ - bad public key: {}", e);
            return HttpResponse::BadRequest().body(e.to_string());
        }
    };

    let mut ledger = state.ledger.lock().expect("mutex poisoned");
    let hash = transaction.hash.clone();
    match ledger.add_tx(transaction, &signer) {
        Ok(()) => HttpResponse::Ok().json(SubmitTxResponse {
            hash,
            pending: ledger.pending().len(),
        }),
        Err(reason) => HttpResponse::Conflict().body(reason.to_string()),
    }
}

/// Dry run: every check's outcome, without queueing the transaction.
#[post("/ledger/check/")]
pub async fn check_tx(
    state: web::Data<AppState>,
    body: web::Json<SubmitTxRequest>,
) -> impl Responder {
    let SubmitTxRequest {
        transaction,
        public_key,
    } = body.into_inner();
    let signer = match parse_public_key_hex(&public_key) {
        Ok(pk) => pk,
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };

    let ledger = state.ledger.lock().expect("mutex poisoned");
    let checks = ledger.check(&transaction, &signer);
    let failures: Vec<String> = checks.failures().iter().map(|r| r.to_string()).collect();
    HttpResponse::Ok().json(CheckTxResponse {
        hash: transaction.hash,
        valid: failures.is_empty(),
        reason: failures.first().cloned(),
        failures,
        checks,
    })
}

/// Seal the pending set into a new signed block.
#[post("/ledger/mine/")]
pub async fn mine(state: web::Data<AppState>) -> impl Responder {
    let mut ledger = state.ledger.lock().expect("mutex poisoned");
    let block = ledger.mine();
    HttpResponse::Ok().json(block)
}

#[get("/ledger/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(LedgerChainResponse {
        length: ledger.len(),
        valid: ledger.verify_chain(),
        authority: ledger.authority_address(),
        authority_public_key: hex::encode(ledger.authority_public_key().serialize()),
        chain: ledger.chain(),
    })
}

#[get("/ledger/pending/")]
pub async fn get_pending(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(PendingResponse {
        size: ledger.pending().len(),
        transactions: ledger.pending(),
    })
}
