//! Signed-cookie identity.
//!
//! Every request carries a `user_id` cookie and a `signature` cookie holding
//! the hex HMAC-SHA256 of the user id. A missing or forged pair gets a fresh
//! identity; the user id reaches handlers as a [`UserId`] extension.

use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

pub const USER_ID_COOKIE: &str = "user_id";
pub const SIGNATURE_COOKIE: &str = "signature";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid signing key")]
    InvalidKey,
}

/// Signs and verifies user ids with a shared secret.
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha256,
}

impl Signer {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, AuthError> {
        let mac = HmacSha256::new_from_slice(secret.as_ref()).map_err(|_| AuthError::InvalidKey)?;
        Ok(Self { mac })
    }

    /// Hex-encoded signature of `user_id`.
    pub fn sign(&self, user_id: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(user_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of a hex signature.
    pub fn verify(&self, user_id: &str, signature: &str) -> bool {
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(user_id.as_bytes());
        mac.verify_slice(&signature).is_ok()
    }
}

/// The caller's identity, inserted by [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

/// Finds cookie `name` across every `Cookie` header.
fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

fn verified_user(headers: &HeaderMap, signer: &Signer) -> Option<String> {
    let user_id = read_cookie(headers, USER_ID_COOKIE).filter(|id| !id.is_empty())?;
    let signature = read_cookie(headers, SIGNATURE_COOKIE)?;
    signer
        .verify(user_id, signature)
        .then(|| user_id.to_string())
}

fn set_cookie(response: &mut Response, name: &str, value: &str) {
    match HeaderValue::from_str(&format!("{name}={value}; Path=/")) {
        Ok(header) => {
            response.headers_mut().append(SET_COOKIE, header);
        }
        Err(err) => warn!(cookie = name, error = %err, "failed to encode cookie"),
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(user_id) = verified_user(request.headers(), state.signer()) {
        request.extensions_mut().insert(UserId(user_id));
        return next.run(request).await;
    }

    let user_id = Uuid::new_v4().to_string();
    let signature = state.signer().sign(&user_id);
    debug!(user_id = %user_id, "issued new identity");

    request.extensions_mut().insert(UserId(user_id.clone()));
    let mut response = next.run(request).await;

    set_cookie(&mut response, USER_ID_COOKIE, &user_id);
    set_cookie(&mut response, SIGNATURE_COOKIE, &signature);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn signature_round_trip() {
        let signer = Signer::new("secret").unwrap();
        let signature = signer.sign("user-1");

        assert_eq!(signature.len(), 64);
        assert!(signer.verify("user-1", &signature));
        assert!(!signer.verify("user-2", &signature));
        assert!(!signer.verify("user-1", "not-hex"));
    }

    #[test]
    fn signature_depends_on_secret() {
        let a = Signer::new("one").unwrap();
        let b = Signer::new("two").unwrap();
        assert!(!b.verify("user-1", &a.sign("user-1")));
    }

    #[test]
    fn reads_cookie_among_others() {
        let headers = headers("theme=dark; user_id=abc ; signature=ff00");
        assert_eq!(read_cookie(&headers, "user_id"), Some("abc"));
        assert_eq!(read_cookie(&headers, "signature"), Some("ff00"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn verified_user_requires_matching_pair() {
        let signer = Signer::new("secret").unwrap();
        let good = format!("user_id=u1; signature={}", signer.sign("u1"));
        assert_eq!(verified_user(&headers(&good), &signer), Some("u1".to_string()));

        let forged = format!("user_id=u2; signature={}", signer.sign("u1"));
        assert_eq!(verified_user(&headers(&forged), &signer), None);

        assert_eq!(verified_user(&headers("user_id=u1"), &signer), None);
        assert_eq!(verified_user(&HeaderMap::new(), &signer), None);
    }
}
