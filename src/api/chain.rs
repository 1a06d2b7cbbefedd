use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};
use std::time::Duration;

use super::mining::cancel_stale;
use super::models::{
    AppState, ChainResponse, DifficultyResponse, SetTargetTimeRequest, ValidateResponse,
};
use crate::blockchain::{Blockchain, CancelToken};

/// Get the full proof-of-work chain.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let bc = state.blockchain.lock().expect("mutex poisoned");
    let resp = ChainResponse {
        length: bc.len(),
        bits: bc.bits(),
        difficulty: bc.difficulty().ok(),
        chain: &bc.chain,
    };
    HttpResponse::Ok().json(resp)
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let bc = state.blockchain.lock().expect("mutex poisoned");
    let resp = ValidateResponse {
        valid: bc.is_valid_chain(),
        length: bc.len(),
        bits: bc.bits(),
    };
    HttpResponse::Ok().json(resp)
}

/// Mine the next block in the foreground, holding the chain lock for the
/// whole search. Background jobs racing for the same height are cancelled.
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>) -> impl Responder {
    let chain_state = state.clone();
    let mined = web::block(move || {
        let mut bc = chain_state.blockchain.lock().expect("mutex poisoned");
        bc.mine_next(&CancelToken::new()).cloned()
    })
    .await;

    match mined {
        Ok(Ok(block)) => {
            info!(
                "POST /mine/ - block #{} mined (nonce={}, bits={:#010x})",
                block.index, block.nonce, block.bits
            );
            let mut jobs = state.mining_jobs.lock().expect("mutex poisoned");
            cancel_stale(&mut jobs, "", block.index);
            HttpResponse::Ok().json(block)
        }
        Ok(Err(e)) => {
            warn!("POST /mine/ - failed: {}", e);
            HttpResponse::InternalServerError().body(e.to_string())
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

fn difficulty_response(bc: &Blockchain) -> DifficultyResponse {
    DifficultyResponse {
        bits: bc.bits(),
        bits_hex: format!("{:#010x}", bc.bits()),
        difficulty: bc.difficulty().ok(),
        target_block_time_secs: bc.target_block_time().as_secs_f64(),
        retarget_window: bc.retarget_window(),
    }
}

#[get("/difficulty/")]
pub async fn get_difficulty(state: web::Data<AppState>) -> impl Responder {
    let bc = state.blockchain.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(difficulty_response(&bc))
}

/// Change the desired block spacing. Bits follow at the next window boundary.
#[post("/difficulty/")]
pub async fn set_difficulty(
    state: web::Data<AppState>,
    body: web::Json<SetTargetTimeRequest>,
) -> impl Responder {
    let mut bc = state.blockchain.lock().expect("mutex poisoned");
    let target = Duration::from_secs(body.target_block_time_secs);
    if let Err(e) = bc.set_target_block_time(target) {
        warn!("POST /difficulty/ - rejected: {}", e);
        return HttpResponse::BadRequest().body(e.to_string());
    }
    info!(
        "POST /difficulty/ - target block time set to {}s",
        body.target_block_time_secs
    );
    HttpResponse::Ok().json(difficulty_response(&bc))
}
