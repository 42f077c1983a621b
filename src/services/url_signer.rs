//! Time-limited download URLs.
//!
//! A signed URL has the shape
//! `{public_url}/objects/{bucket}/{key}?expires={unix}&signature={sig}` where
//! `sig` is the URL-safe base64 HMAC-SHA256 of `GET\n{bucket}\n{key}\n{expires}`.
//! The download handler recomputes the MAC and compares in constant time.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::{fmt, sync::Arc, time::Duration};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature")]
    Malformed,
    #[error("signature does not match")]
    Mismatch,
    #[error("link expired at {0}")]
    Expired(i64),
}

#[derive(Clone)]
pub struct UrlSigner {
    secret: Arc<[u8]>,
    public_url: String,
}

impl fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlSigner")
            .field("public_url", &self.public_url)
            .finish_non_exhaustive()
    }
}

impl UrlSigner {
    pub fn new(secret: impl AsRef<[u8]>, public_url: impl Into<String>) -> Self {
        let public_url = public_url.into().trim_end_matches('/').to_string();
        Self {
            secret: Arc::from(secret.as_ref()),
            public_url,
        }
    }

    pub fn sign(&self, bucket: &str, key: &str, ttl: Duration) -> String {
        self.sign_at(bucket, key, ttl, Utc::now())
    }

    pub fn sign_at(&self, bucket: &str, key: &str, ttl: Duration, now: DateTime<Utc>) -> String {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires = now.timestamp().saturating_add(ttl_secs);
        let digest = self.mac(bucket, key, expires).finalize().into_bytes();
        let signature = URL_SAFE_NO_PAD.encode(digest);

        format!(
            "{}/objects/{}/{}?expires={}&signature={}",
            self.public_url,
            bucket,
            encode_key(key),
            expires,
            signature
        )
    }

    /// Check a presented signature. A forged signature is reported as a
    /// mismatch even when its expiry has also passed.
    pub fn verify(
        &self,
        bucket: &str,
        key: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let presented = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SignatureError::Malformed)?;
        self.mac(bucket, key, expires)
            .verify_slice(&presented)
            .map_err(|_| SignatureError::Mismatch)?;

        if now.timestamp() > expires {
            return Err(SignatureError::Expired(expires));
        }
        Ok(())
    }

    fn mac(&self, bucket: &str, key: &str, expires: i64) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(b"GET\n");
        mac.update(bucket.as_bytes());
        mac.update(b"\n");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }
}

/// Percent-encode each key segment, keeping `/` separators readable.
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UrlSigner {
        UrlSigner::new("0123456789abcdef0123456789abcdef", "http://localhost:3000/")
    }

    fn query_param<'a>(url: &'a str, name: &str) -> &'a str {
        let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix(&format!("{}=", name)))
            .unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let now = Utc::now();
        let url = signer().sign_at("gallery", "Docs/my file.pdf", Duration::from_secs(3600), now);
        assert!(url.starts_with("http://localhost:3000/objects/gallery/Docs/my%20file.pdf?"));

        let expires: i64 = query_param(&url, "expires").parse().unwrap();
        assert_eq!(expires, now.timestamp() + 3600);
        let signature = query_param(&url, "signature");
        assert_eq!(
            signer().verify("gallery", "Docs/my file.pdf", expires, signature, now),
            Ok(())
        );
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let now = Utc::now();
        let url = signer().sign_at("gallery", "a.png", Duration::from_secs(60), now);
        let expires: i64 = query_param(&url, "expires").parse().unwrap();
        let signature = query_param(&url, "signature");

        assert_eq!(
            signer().verify("gallery", "b.png", expires, signature, now),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            signer().verify("gallery", "a.png", expires + 1, signature, now),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            signer().verify("gallery", "a.png", expires, "%%%", now),
            Err(SignatureError::Malformed)
        );
        let other = UrlSigner::new("another-secret-entirely-different", "http://localhost:3000");
        assert_eq!(
            other.verify("gallery", "a.png", expires, signature, now),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_verify_rejects_expired_links() {
        let issued = Utc::now() - chrono::Duration::hours(2);
        let url = signer().sign_at("gallery", "a.png", Duration::from_secs(3600), issued);
        let expires: i64 = query_param(&url, "expires").parse().unwrap();
        let signature = query_param(&url, "signature");

        assert_eq!(
            signer().verify("gallery", "a.png", expires, signature, Utc::now()),
            Err(SignatureError::Expired(expires))
        );
    }
}
