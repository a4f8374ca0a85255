//! Admin API key signing.
//!
//! Ghost Admin API keys have the form `<id>:<hex secret>`. Requests
//! authenticate with a short-lived HS256 JWT signed with the decoded
//! secret.
//!
//! ## Token Format
//!
//! - header: `{"alg":"HS256","kid":<id>,"typ":"JWT"}`
//! - claims: `{"aud":"/v5/admin/","exp":<iat + 600>,"iat":<now>}`
//! - signature: HMAC-SHA256 over `header.claims`
//!
//! Each part is base64url without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Token lifetime in seconds.
const TOKEN_LIFETIME_SECS: u64 = 600;

/// Audience Ghost checks against the major API version.
const AUDIENCE: &str = "/v5/admin/";

/// Errors while signing an Admin API key.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The key is not `<id>:<secret>`.
    #[error("expected <id>:<secret>")]
    Malformed,

    /// The secret is not hex.
    #[error("secret is not valid hex: {0}")]
    Secret(#[from] hex::FromHexError),

    /// Header or claims failed to encode.
    #[error("failed to encode token: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Header<'a> {
    alg: &'static str,
    kid: &'a str,
    typ: &'static str,
}

#[derive(Serialize)]
struct Claims {
    aud: &'static str,
    exp: u64,
    iat: u64,
}

/// Returns true if `value` looks like a raw Admin API key rather than a
/// signed token.
pub fn is_admin_key(value: &str) -> bool {
    value.contains(':')
}

/// Current Unix time in seconds.
pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Signs `key` into a JWT issued at `iat`.
pub fn sign_admin_key(key: &str, iat: u64) -> Result<String, AuthError> {
    let (id, secret_hex) = key.split_once(':').ok_or(AuthError::Malformed)?;
    if id.is_empty() || secret_hex.is_empty() {
        return Err(AuthError::Malformed);
    }
    let secret = hex::decode(secret_hex)?;

    let header = serde_json::to_vec(&Header {
        alg: "HS256",
        kid: id,
        typ: "JWT",
    })?;
    let claims = serde_json::to_vec(&Claims {
        aud: AUDIENCE,
        exp: iat + TOKEN_LIFETIME_SECS,
        iat,
    })?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(claims)
    );
    let signature = sign(&secret, signing_input.as_bytes());
    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

fn sign(secret: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().into()
}
