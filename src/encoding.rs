use serde::Serialize;
use sha2::{Digest, Sha256};

/// Canonical JSON bytes: compact, object keys sorted.
///
/// Going through `serde_json::Value` sorts every object's keys (the default
/// map is a BTreeMap), so struct field order never leaks into hashes.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    let value = serde_json::to_value(value).expect("serialize canonical value");
    serde_json::to_vec(&value).expect("serialize canonical json")
}

/// SHA-256 of `bytes`, lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(sha256(bytes))
}

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

/// Hash of the canonical encoding of `value`.
pub fn hash_canonical<T: Serialize + ?Sized>(value: &T) -> String {
    sha256_hex(&canonical_json(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_and_compact() {
        #[derive(Serialize)]
        struct Unordered {
            zeta: u8,
            alpha: u8,
        }
        let bytes = canonical_json(&Unordered { zeta: 1, alpha: 2 });
        assert_eq!(bytes, br#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn nested_objects_are_sorted() {
        let v = json!({ "b": { "y": 1, "x": [ { "q": 0, "p": 1 } ] }, "a": -1 });
        assert_eq!(
            String::from_utf8(canonical_json(&v)).unwrap(),
            r#"{"a":-1,"b":{"x":[{"p":1,"q":0}],"y":1}}"#
        );
    }

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
