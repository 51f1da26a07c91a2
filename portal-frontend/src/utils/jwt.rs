use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Tenant the token was minted for; absent when the auth API is not
    /// tenant-aware.
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

/// Decode JWT claims without validating the signature.
///
/// The portal only ever sees tokens it obtained itself from the auth API over
/// an authenticated channel, so claim extraction does not re-verify them. The
/// auth and data APIs verify signatures on every call that actually uses the
/// token.
pub fn decode_jwt_claims(token: &str) -> Result<JwtClaims> {
    let parts: Vec<&str> = token.split('.').collect();

    if parts.len() != 3 {
        return Err(anyhow::anyhow!("Invalid JWT format"));
    }

    // Decode the payload (second part)
    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|e| anyhow::anyhow!("Failed to decode JWT payload: {}", e))?;

    let claims: JwtClaims = serde_json::from_slice(&payload)
        .map_err(|e| anyhow::anyhow!("Failed to parse JWT claims: {}", e))?;

    Ok(claims)
}

/// Whether the token's expiry has passed. Tokens that cannot be decoded
/// count as expired.
pub fn is_token_expired(token: &str) -> bool {
    match decode_jwt_claims(token) {
        Ok(claims) => claims.exp <= Utc::now().timestamp(),
        Err(_) => true,
    }
}
