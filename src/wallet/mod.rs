use std::collections::BTreeMap;

use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};

use crate::encoding::{sha256, sha256_hex};
use crate::error::WalletError;
use crate::transaction::{Location, Tx};

/// A secp256k1 key pair together with its derived address.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
    pub address: String,
}

impl KeyPair {
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self::from_keys(secret_key, public_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::signing_only();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self::from_keys(secret_key, public_key)
    }

    fn from_keys(secret_key: SecretKey, public_key: PublicKey) -> Self {
        Self {
            secret_key,
            public_key,
            address: address_of(&public_key),
        }
    }

    /// Build and sign a transaction spending `location` (user side).
    pub fn send_tx(&self, receivers: BTreeMap<String, u64>, location: Location) -> Tx {
        let mut tx = Tx::new(self.address.clone(), location, receivers);
        tx.signature = sign_hash(&self.secret_key, &tx.hash);
        tx
    }
}

/// Generate a new keypair and return (priv_hex, pub_hex_compressed, address).
pub fn generate_keypair_hex() -> (String, String, String) {
    let keys = KeyPair::generate();
    (
        hex::encode(keys.secret_key.secret_bytes()),
        hex::encode(keys.public_key.serialize()),
        keys.address,
    )
}

/// Address: SHA-256 of the 64-byte `x || y` public key coordinates, hex.
pub fn address_of(public_key: &PublicKey) -> String {
    let uncompressed = public_key.serialize_uncompressed();
    sha256_hex(&uncompressed[1..])
}

pub fn parse_public_key_hex(pubkey_hex: &str) -> Result<PublicKey, WalletError> {
    let bytes = hex::decode(pubkey_hex).map_err(|_| WalletError::InvalidHex)?;
    PublicKey::from_slice(&bytes).map_err(|_| WalletError::InvalidPublicKey)
}

pub fn parse_secret_key_hex(secret_hex: &str) -> Result<SecretKey, WalletError> {
    let bytes = hex::decode(secret_hex).map_err(|_| WalletError::InvalidHex)?;
    SecretKey::from_slice(&bytes).map_err(|_| WalletError::InvalidSecretKey)
}

/// The signed message is the SHA-256 of the hex hash string.
fn hash_message(hash_hex: &str) -> Message {
    Message::from_digest(sha256(hash_hex.as_bytes()))
}

/// Sign a hash string; returns the hex DER ECDSA signature.
pub fn sign_hash(secret_key: &SecretKey, hash_hex: &str) -> String {
    let secp = Secp256k1::signing_only();
    let sig = secp.sign_ecdsa(&hash_message(hash_hex), secret_key);
    hex::encode(sig.serialize_der())
}

/// Verify a hex DER signature over a hash string. Malformed input is simply
/// not a valid signature.
pub fn verify_hash(public_key: &PublicKey, sig_hex: &str, hash_hex: &str) -> bool {
    let secp = Secp256k1::verification_only();
    let Ok(sig_bytes) = hex::decode(sig_hex) else {
        return false;
    };
    let Ok(sig) = Signature::from_der(&sig_bytes) else {
        return false;
    };
    secp.verify_ecdsa(&hash_message(hash_hex), &sig, public_key)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_verifies_only_for_its_key_and_hash() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let sig = sign_hash(&alice.secret_key, "abc");
        assert!(verify_hash(&alice.public_key, &sig, "abc"));
        assert!(!verify_hash(&alice.public_key, &sig, "abd"));
        assert!(!verify_hash(&bob.public_key, &sig, "abc"));
    }

    #[test]
    fn garbage_signature_is_invalid() {
        let alice = KeyPair::generate();
        assert!(!verify_hash(&alice.public_key, "zz", "abc"));
        assert!(!verify_hash(&alice.public_key, "3006020101020101", "abc"));
    }

    #[test]
    fn address_is_fixed_width_hash() {
        let keys = KeyPair::generate();
        assert_eq!(keys.address.len(), 64);
        assert_eq!(keys.address, address_of(&keys.public_key));
        let again = KeyPair::from_secret_key(keys.secret_key);
        assert_eq!(again.address, keys.address);
    }

    #[test]
    fn hex_keys_round_trip() {
        let (sk_hex, pk_hex, address) = generate_keypair_hex();
        let sk = parse_secret_key_hex(&sk_hex).unwrap();
        let pk = parse_public_key_hex(&pk_hex).unwrap();
        assert_eq!(KeyPair::from_secret_key(sk).public_key, pk);
        assert_eq!(address_of(&pk), address);
        assert_eq!(parse_public_key_hex("nothex"), Err(WalletError::InvalidHex));
        assert_eq!(parse_public_key_hex("00"), Err(WalletError::InvalidPublicKey));
    }
}
