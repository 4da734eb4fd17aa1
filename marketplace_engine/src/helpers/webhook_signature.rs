//! Verification of signed provider notifications.
//!
//! The provider signs every notification with a pre-shared secret and sends the result in a header of the form
//!
//! ```text
//! t=1700000000,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd
//! ```
//!
//! where `t` is the signing time in unix seconds and each `v1` entry is a hex-encoded HMAC-SHA256 of `"{t}.{body}"`.
//! More than one `v1` entry may be present while a secret is being rolled.
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use log::trace;
use mkt_common::Secret;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_SCHEME: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookSignatureError {
    #[error("No webhook signing secret is configured")]
    MissingSecret,
    #[error("The webhook signing secret cannot be used. {0}")]
    InvalidSecret(String),
    #[error("The request has no signature header")]
    MissingHeader,
    #[error("The signature header is malformed. {0}")]
    MalformedHeader(String),
    #[error("The signature header contains no v1 signatures")]
    NoSignatures,
    #[error("The signature timestamp is outside the allowed tolerance")]
    TimestampOutsideTolerance,
    #[error("No signature matches the payload")]
    SignatureMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

impl FromStr for SignatureHeader {
    type Err = WebhookSignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut timestamp = None;
        let mut signatures = vec![];
        for part in s.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookSignatureError::MalformedHeader(format!("'{part}' is not a key=value pair")))?;
            match key {
                "t" => {
                    let t = value
                        .parse::<i64>()
                        .map_err(|e| WebhookSignatureError::MalformedHeader(format!("Invalid timestamp. {e}")))?;
                    timestamp = Some(t);
                },
                SIGNATURE_SCHEME => match hex::decode(value) {
                    Ok(sig) => signatures.push(sig),
                    Err(e) => trace!("🔐️ Ignoring signature that is not valid hex. {e}"),
                },
                // Other schemes (e.g. v0 test signatures) are not trusted
                _ => {},
            }
        }
        let timestamp = timestamp.ok_or_else(|| WebhookSignatureError::MalformedHeader("No timestamp".into()))?;
        if signatures.is_empty() {
            return Err(WebhookSignatureError::NoSignatures);
        }
        Ok(Self { timestamp, signatures })
    }
}

fn mac_for(secret: &Secret<String>, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, WebhookSignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.reveal().as_bytes())
        .map_err(|e| WebhookSignatureError::InvalidSecret(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Checks that `header` carries a valid signature of `payload` made with `secret` within `tolerance` of `now`.
///
/// An empty secret never verifies anything.
pub fn verify_signature(
    payload: &[u8],
    header: Option<&str>,
    secret: &Secret<String>,
    tolerance: Duration,
    now: DateTime<Utc>,
) -> Result<(), WebhookSignatureError> {
    if secret.is_empty() {
        return Err(WebhookSignatureError::MissingSecret);
    }
    let header = header.ok_or(WebhookSignatureError::MissingHeader)?.parse::<SignatureHeader>()?;
    let tolerance = u64::try_from(tolerance.num_seconds()).unwrap_or(0);
    if now.timestamp().abs_diff(header.timestamp) > tolerance {
        return Err(WebhookSignatureError::TimestampOutsideTolerance);
    }
    let mac = mac_for(secret, header.timestamp, payload)?;
    let matched = header.signatures.iter().any(|sig| mac.clone().verify_slice(sig).is_ok());
    if matched {
        Ok(())
    } else {
        Err(WebhookSignatureError::SignatureMismatch)
    }
}

/// Produces a signature header for `payload`, as the provider would.
pub fn sign_payload(payload: &[u8], secret: &Secret<String>, timestamp: i64) -> Result<String, WebhookSignatureError> {
    let sig = mac_for(secret, timestamp, payload)?.finalize().into_bytes();
    Ok(format!("t={timestamp},{SIGNATURE_SCHEME}={}", hex::encode(sig)))
}
