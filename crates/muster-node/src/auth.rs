//! Caller identity for HTTP requests.
//!
//! A caller proves its identity by signing each mutating request with an
//! ed25519 key:
//!
//! ```text
//! x-muster-key:       hex(public key)
//! x-muster-nonce:     decimal u64
//! x-muster-signature: hex(sign("{METHOD}\n{PATH}\n{nonce}\n{blake3(body) hex}"))
//! ```
//!
//! The resulting [`Principal`] is the hex public key. The nonce must grow
//! with every request a principal sends (a millisecond timestamp works); the
//! ledger service rejects any nonce at or below the last one it accepted.
//! Nothing else about the caller is checked here; authorization is the
//! ledger's job.

use crate::error::{Error, Result};
use axum::http::{HeaderMap, Method};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use muster_ledger::Principal;

/// Header carrying the caller's public key.
pub const KEY_HEADER: &str = "x-muster-key";

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "x-muster-signature";

/// Header carrying the per-principal request counter.
pub const NONCE_HEADER: &str = "x-muster-nonce";

/// Who a mutation runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub principal: Principal,
    /// Signed request counter; `None` for local callers like the admin socket.
    pub nonce: Option<u64>,
}

impl Caller {
    /// A caller reached over a trusted local channel.
    pub fn local(principal: Principal) -> Self {
        Self {
            principal,
            nonce: None,
        }
    }

    /// A caller that signed `nonce` into its request.
    pub fn signed(principal: Principal, nonce: u64) -> Self {
        Self {
            principal,
            nonce: Some(nonce),
        }
    }
}

/// The bytes a caller signs.
pub fn signing_message(method: &str, path: &str, nonce: u64, body: &[u8]) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        method,
        path,
        nonce,
        blake3::hash(body).to_hex()
    )
}

/// Principal for a public key.
pub fn principal_for(key: &VerifyingKey) -> Principal {
    Principal::new(hex::encode(key.as_bytes()))
}

/// Produce `(key header, signature header)` values for a request.
pub fn sign_request(
    key: &SigningKey,
    method: &str,
    path: &str,
    nonce: u64,
    body: &[u8],
) -> (String, String) {
    let message = signing_message(method, path, nonce, body);
    let signature = key.sign(message.as_bytes());
    (
        hex::encode(key.verifying_key().as_bytes()),
        hex::encode(signature.to_bytes()),
    )
}

/// Verify header values and return the signer.
pub fn verify_request(
    key_hex: &str,
    signature_hex: &str,
    method: &str,
    path: &str,
    nonce: u64,
    body: &[u8],
) -> Result<Caller> {
    let key_bytes: [u8; 32] = hex::decode(key_hex.trim())
        .map_err(|e| Error::Auth(format!("bad key encoding: {}", e)))?
        .try_into()
        .map_err(|_| Error::Auth("public key must be 32 bytes".into()))?;
    let key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| Error::Auth(format!("bad public key: {}", e)))?;

    let sig_bytes: [u8; 64] = hex::decode(signature_hex.trim())
        .map_err(|e| Error::Auth(format!("bad signature encoding: {}", e)))?
        .try_into()
        .map_err(|_| Error::Auth("signature must be 64 bytes".into()))?;
    let signature = Signature::from_bytes(&sig_bytes);

    let message = signing_message(method, path, nonce, body);
    key.verify_strict(message.as_bytes(), &signature)
        .map_err(|_| Error::Auth("signature does not match request".into()))?;

    Ok(Caller::signed(principal_for(&key), nonce))
}

/// Authenticate an HTTP request from its headers.
pub fn authenticate(headers: &HeaderMap, method: &Method, path: &str, body: &[u8]) -> Result<Caller> {
    let key = header(headers, KEY_HEADER)?;
    let signature = header(headers, SIGNATURE_HEADER)?;
    let nonce = header(headers, NONCE_HEADER)?
        .trim()
        .parse::<u64>()
        .map_err(|e| Error::Auth(format!("bad {} header: {}", NONCE_HEADER, e)))?;
    verify_request(
        key,
        signature,
        method.as_str(),
        path,
        nonce,
        body,
    )
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Auth(format!("missing {} header", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    #[test]
    fn signed_request_yields_signer() {
        let signer = key(7);
        let body = br#"{"points":10}"#;
        let (k, s) = sign_request(&signer, "POST", "/api/v1/merits/claim", 1, body);

        let caller = verify_request(&k, &s, "POST", "/api/v1/merits/claim", 1, body).unwrap();
        assert_eq!(caller.principal, principal_for(&signer.verifying_key()));
        assert_eq!(caller.principal.as_str().len(), 64);
        assert_eq!(caller.nonce, Some(1));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let signer = key(7);
        let (k, s) = sign_request(&signer, "POST", "/api/v1/merits/claim", 1, br#"{"points":10}"#);
        let err = verify_request(&k, &s, "POST", "/api/v1/merits/claim", 1, br#"{"points":99}"#);
        assert!(matches!(err, Err(Error::Auth(_))));
    }

    #[test]
    fn signature_is_bound_to_nonce() {
        let signer = key(7);
        let body = br#"{"points":10}"#;
        let (k, s) = sign_request(&signer, "POST", "/api/v1/merits/claim", 5, body);
        assert!(verify_request(&k, &s, "POST", "/api/v1/merits/claim", 6, body).is_err());
    }

    #[test]
    fn signature_is_bound_to_path() {
        let signer = key(9);
        let (k, s) = sign_request(&signer, "POST", "/api/v1/gatherings/1/join", 1, b"");
        assert!(verify_request(&k, &s, "POST", "/api/v1/gatherings/2/join", 1, b"").is_err());
    }

    #[test]
    fn missing_headers_fail() {
        let headers = HeaderMap::new();
        let err = authenticate(&headers, &Method::POST, "/x", b"");
        assert!(matches!(err, Err(Error::Auth(msg)) if msg.contains(KEY_HEADER)));
    }

    #[test]
    fn headers_round_trip() {
        let signer = key(3);
        let (k, s) = sign_request(&signer, "POST", "/api/v1/gatherings/4/join", 42, b"");
        let mut headers = HeaderMap::new();
        headers.insert(KEY_HEADER, HeaderValue::from_str(&k).unwrap());
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&s).unwrap());
        headers.insert(NONCE_HEADER, HeaderValue::from_static("42"));

        let caller =
            authenticate(&headers, &Method::POST, "/api/v1/gatherings/4/join", b"").unwrap();
        assert_eq!(caller, Caller::signed(principal_for(&signer.verifying_key()), 42));

        headers.insert(NONCE_HEADER, HeaderValue::from_static("forty-two"));
        let err = authenticate(&headers, &Method::POST, "/api/v1/gatherings/4/join", b"");
        assert!(matches!(err, Err(Error::Auth(msg)) if msg.contains(NONCE_HEADER)));
    }
}
