use actix_web::{HttpResponse, Responder, post, web};
use log::debug;

use super::models::{NewWalletResponse, SendRequest, SendResponse};
use crate::wallet::{KeyPair, generate_keypair_hex, parse_secret_key_hex};

#[post("/wallet/new/")]
pub async fn create_wallet() -> impl Responder {
    let (sk, pk, addr) = generate_keypair_hex();
    HttpResponse::Ok().json(NewWalletResponse {
        private_key: sk,
        public_key: pk,
        address: addr,
    })
}

/// DEV helper: build and sign a transaction with the given private key.
/// Nothing is submitted; post the result to `/ledger/tx/`.
#[post("/wallet/send/")]
pub async fn send(body: web::Json<SendRequest>) -> impl Responder {
    let SendRequest {
        private_key,
        receivers,
        location,
    } = body.into_inner();

    let keys = match parse_secret_key_hex(&private_key) {
        Ok(sk) => KeyPair::from_secret_key(sk),
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };
    let tx = keys.send_tx(receivers, location);
    debug!("WALLET - signed tx {} from {}", tx.hash, keys.address);

    HttpResponse::Ok().json(SendResponse {
        public_key: hex::encode(keys.public_key.serialize()),
        transaction: tx,
    })
}
