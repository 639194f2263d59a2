/*
[INPUT]:  Opaque bearer tokens (header.payload.signature)
[OUTPUT]: Expiry timestamp and "expiring soon" decisions
[POS]:    Auth layer - unverified expiry claim decoding
[UPDATE]: When token format or the expiry claim changes
*/

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
use chrono::{DateTime, TimeDelta, Utc};

use crate::http::DecodeError;

/// Read the `exp` claim of a token without verifying its signature or issuer.
pub fn decode_expiry(token: &str) -> Result<DateTime<Utc>, DecodeError> {
    let mut segments = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(DecodeError::Structure);
    };

    let payload = payload.trim_end_matches('=');
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .map_err(|e| DecodeError::Base64(e.to_string()))?;

    let claims: serde_json::Value =
        serde_json::from_slice(&payload_bytes).map_err(|e| DecodeError::Json(e.to_string()))?;

    let exp = claims.get("exp").ok_or(DecodeError::MissingExpiry)?;
    let seconds = exp
        .as_i64()
        .or_else(|| exp.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))
        .ok_or(DecodeError::InvalidExpiry)?;

    DateTime::from_timestamp(seconds, 0).ok_or(DecodeError::InvalidExpiry)
}

/// True when the token expires within `threshold_minutes`, or cannot be decoded.
pub fn is_expiring_soon(token: &str, threshold_minutes: i64) -> bool {
    is_expiring_soon_at(token, threshold_minutes, Utc::now())
}

/// Same as [`is_expiring_soon`] against an explicit clock reading.
pub fn is_expiring_soon_at(token: &str, threshold_minutes: i64, now: DateTime<Utc>) -> bool {
    match decode_expiry(token) {
        // A threshold too large for a duration covers every representable expiry
        Ok(expires_at) => TimeDelta::try_minutes(threshold_minutes)
            .is_none_or(|threshold| expires_at - now < threshold),
        Err(err) => {
            tracing::debug!(error = %err, "cannot read token expiry, treating as expiring");
            true
        }
    }
}
