//! Signed session token codec.
//!
//! Token layout: `base64url(claims JSON) "." base64url(HMAC-SHA256)`, both
//! parts unpadded. The MAC covers the encoded payload text.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::error::Error;
use std::fmt::{Display, Formatter};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Identity carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "id")]
    pub subject_id: String,
    pub username: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub role: String,
    /// Expiry in epoch milliseconds; the token is valid strictly before it.
    #[serde(rename = "exp")]
    pub expires_at_ms: i64,
}

/// Opaque verification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDenied;

impl Display for AccessDenied {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "access denied")
    }
}

impl Error for AccessDenied {}

/// Token issuing failures.
#[derive(Debug)]
pub enum TokenError {
    EmptySecret,
    InvalidKey,
    InvalidTtl(u64),
    Encode(serde_json::Error),
}

impl Display for TokenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySecret => write!(f, "token secret cannot be empty"),
            Self::InvalidKey => write!(f, "token secret rejected by the MAC"),
            Self::InvalidTtl(secs) => write!(f, "token ttl {secs}s is out of range"),
            Self::Encode(err) => write!(f, "failed to encode token claims: {err}"),
        }
    }
}

impl Error for TokenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TokenError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Verification contract consumed by the request boundary.
pub trait TokenVerifier: Send + Sync {
    /// Returns the claims of a valid token at `now`.
    fn verify(&self, token: Option<&str>, now: DateTime<Utc>) -> Result<Claims, AccessDenied>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DenialReason {
    Missing,
    Malformed,
    BadSignature,
    Expired,
}

impl DenialReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Malformed => "malformed",
            Self::BadSignature => "bad_signature",
            Self::Expired => "expired",
        }
    }
}

/// HMAC-SHA256 token codec keyed by a shared secret.
#[derive(Clone)]
pub struct SignedTokenCodec {
    mac: HmacSha256,
}

impl std::fmt::Debug for SignedTokenCodec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedTokenCodec").finish_non_exhaustive()
    }
}

impl SignedTokenCodec {
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        let mac =
            HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::InvalidKey)?;
        Ok(Self { mac })
    }

    /// Encodes and signs `claims`.
    pub fn issue(&self, claims: &Claims) -> Result<String, TokenError> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes()));
        Ok(format!("{payload}.{signature}"))
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    fn check(&self, token: Option<&str>, now: DateTime<Utc>) -> Result<Claims, DenialReason> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(DenialReason::Missing)?;
        let (payload, signature) = token.split_once('.').ok_or(DenialReason::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| DenialReason::Malformed)?;

        let expected = self.sign(payload.as_bytes());
        if !bool::from(expected.as_slice().ct_eq(signature.as_slice())) {
            return Err(DenialReason::BadSignature);
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| DenialReason::Malformed)?;
        let claims: Claims = serde_json::from_slice(&json).map_err(|_| DenialReason::Malformed)?;
        if now.timestamp_millis() >= claims.expires_at_ms {
            return Err(DenialReason::Expired);
        }
        Ok(claims)
    }
}

impl TokenVerifier for SignedTokenCodec {
    fn verify(&self, token: Option<&str>, now: DateTime<Utc>) -> Result<Claims, AccessDenied> {
        match self.check(token, now) {
            Ok(claims) => {
                debug!(
                    "event=token_verify module=auth status=ok subject={}",
                    claims.subject_id
                );
                Ok(claims)
            }
            Err(reason) => {
                warn!(
                    "event=token_verify module=auth status=denied reason={}",
                    reason.as_str()
                );
                Err(AccessDenied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Claims, DenialReason, SignedTokenCodec};
    use chrono::{TimeZone, Utc};

    fn claims(expires_at_ms: i64) -> Claims {
        Claims {
            subject_id: "1".to_string(),
            username: "admin".to_string(),
            display_name: "Administrador".to_string(),
            role: "admin".to_string(),
            expires_at_ms,
        }
    }

    #[test]
    fn expiry_is_exclusive() {
        let codec = SignedTokenCodec::new("secret").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let token = codec.issue(&claims(now.timestamp_millis())).unwrap();
        assert_eq!(codec.check(Some(&token), now), Err(DenialReason::Expired));
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let codec = SignedTokenCodec::new("secret").unwrap();
        let token = codec.issue(&claims(i64::MAX)).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged = format!("eyJpZCI6IjIifQ.{signature}");
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(
            codec.check(Some(&forged), now),
            Err(DenialReason::BadSignature)
        );
    }

    #[test]
    fn blank_and_undotted_tokens_are_rejected_early() {
        let codec = SignedTokenCodec::new("secret").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(codec.check(Some("  "), now), Err(DenialReason::Missing));
        assert_eq!(codec.check(Some("abc"), now), Err(DenialReason::Malformed));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(SignedTokenCodec::new("").is_err());
    }
}
