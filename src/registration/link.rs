//! Signed, expiring verification links.
//!
//! A link carries its own integrity: an HMAC-SHA256 signature over the
//! verification path, the payload token, and the expiry timestamp. The
//! signature is checked before the expiry is trusted, so a forged `expires`
//! value cannot extend a link's lifetime.

use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

/// Path the signed verification links point at.
pub const VERIFY_PATH: &str = "/register/verify";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("link has expired")]
    Expired,
    #[error("link signature is invalid")]
    InvalidSignature,
}

#[derive(Clone)]
pub struct SignedLinks {
    key: Vec<u8>,
    base_url: String,
}

impl SignedLinks {
    pub fn new(secret_key: &str, base_url: &str) -> Self {
        Self {
            key: secret_key.as_bytes().to_vec(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build an absolute verification URL for a payload token, valid for
    /// `ttl` from `now`. Both the token and the signature are base64url, so
    /// no further escaping is needed.
    pub fn verification_link(
        &self,
        payload_token: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> String {
        let expires = (now + ttl).timestamp();
        let signature = self.sign(VERIFY_PATH, payload_token, expires);
        format!(
            "{}{}?payload={}&expires={}&signature={}",
            self.base_url, VERIFY_PATH, payload_token, expires, signature
        )
    }

    /// Check a link's signature, then its expiry.
    pub fn verify(
        &self,
        path: &str,
        payload_token: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LinkError> {
        let raw = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| LinkError::InvalidSignature)?;
        self.mac(path, payload_token, expires)
            .verify_slice(&raw)
            .map_err(|_| LinkError::InvalidSignature)?;
        if now.timestamp() > expires {
            return Err(LinkError::Expired);
        }
        Ok(())
    }

    fn mac(&self, path: &str, payload_token: &str, expires: i64) -> HmacSha256 {
        // HMAC accepts keys of any length, so new_from_slice cannot fail.
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC key");
        mac.update(path.as_bytes());
        mac.update(b"|");
        mac.update(payload_token.as_bytes());
        mac.update(b"|");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    fn sign(&self, path: &str, payload_token: &str, expires: i64) -> String {
        URL_SAFE_NO_PAD.encode(self.mac(path, payload_token, expires).finalize().into_bytes())
    }
}

/// Middleware guarding the verification endpoint.
///
/// Tampered, forged, or expired links are redirected to the landing page
/// with no error detail: to the visitor a bad link looks exactly like a
/// stale bookmark.
pub async fn require_signed_link(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let query = request.uri().query().unwrap_or("");

    let mut payload_token = String::new();
    let mut expires: Option<i64> = None;
    let mut signature: Option<String> = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "payload" => payload_token = value.into_owned(),
            "expires" => expires = value.parse().ok(),
            "signature" => signature = Some(value.into_owned()),
            _ => {}
        }
    }

    let (Some(expires), Some(signature)) = (expires, signature) else {
        debug!("verification link missing expiry or signature");
        return Redirect::to("/").into_response();
    };

    if let Err(reason) = state.links.verify(
        request.uri().path(),
        &payload_token,
        expires,
        &signature,
        Utc::now(),
    ) {
        info!(%reason, "rejected verification link");
        return Redirect::to("/").into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_link(link: &str) -> (String, i64, String) {
        let query = link.split_once('?').unwrap().1;
        let mut payload = String::new();
        let mut expires = 0;
        let mut signature = String::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "payload" => payload = value.into_owned(),
                "expires" => expires = value.parse().unwrap(),
                "signature" => signature = value.into_owned(),
                _ => {}
            }
        }
        (payload, expires, signature)
    }

    #[test_log::test]
    fn test_fresh_link_verifies() {
        let links = SignedLinks::new("secret", "https://tools.example.com/");
        let now = Utc::now();
        let link = links.verification_link("token", Duration::from_secs(3600), now);
        assert!(link.starts_with("https://tools.example.com/register/verify?payload=token"));

        let (payload, expires, signature) = split_link(&link);
        assert!(links
            .verify(VERIFY_PATH, &payload, expires, &signature, now)
            .is_ok());
    }

    #[test_log::test]
    fn test_expired_link() {
        let links = SignedLinks::new("secret", "https://tools.example.com");
        let issued = Utc::now() - chrono::Duration::hours(2);
        let link = links.verification_link("token", Duration::from_secs(3600), issued);
        let (payload, expires, signature) = split_link(&link);

        assert_eq!(
            links.verify(VERIFY_PATH, &payload, expires, &signature, Utc::now()),
            Err(LinkError::Expired)
        );
    }

    #[test_log::test]
    fn test_forged_expiry_fails_signature_before_expiry() {
        let links = SignedLinks::new("secret", "https://tools.example.com");
        let issued = Utc::now() - chrono::Duration::hours(2);
        let link = links.verification_link("token", Duration::from_secs(3600), issued);
        let (payload, expires, signature) = split_link(&link);

        // Pushing the expiry forward without re-signing must read as forgery,
        // not as a still-valid link.
        assert_eq!(
            links.verify(VERIFY_PATH, &payload, expires + 86_400, &signature, Utc::now()),
            Err(LinkError::InvalidSignature)
        );
    }

    #[test_log::test]
    fn test_tampered_payload_or_path() {
        let links = SignedLinks::new("secret", "https://tools.example.com");
        let now = Utc::now();
        let link = links.verification_link("token", Duration::from_secs(3600), now);
        let (_, expires, signature) = split_link(&link);

        assert_eq!(
            links.verify(VERIFY_PATH, "other-token", expires, &signature, now),
            Err(LinkError::InvalidSignature)
        );
        assert_eq!(
            links.verify("/register", "token", expires, &signature, now),
            Err(LinkError::InvalidSignature)
        );
    }

    #[test_log::test]
    fn test_different_key_rejects() {
        let links = SignedLinks::new("secret", "https://tools.example.com");
        let other = SignedLinks::new("other", "https://tools.example.com");
        let now = Utc::now();
        let link = links.verification_link("token", Duration::from_secs(3600), now);
        let (payload, expires, signature) = split_link(&link);

        assert_eq!(
            other.verify(VERIFY_PATH, &payload, expires, &signature, now),
            Err(LinkError::InvalidSignature)
        );
    }

    #[test_log::test]
    fn test_garbage_signature() {
        let links = SignedLinks::new("secret", "https://tools.example.com");
        assert_eq!(
            links.verify(VERIFY_PATH, "token", 0, "%%%", Utc::now()),
            Err(LinkError::InvalidSignature)
        );
    }
}
