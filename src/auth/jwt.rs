//! JWT token encoding and decoding using HS256.
//!
//! The token carries identity claims only, never the platform role.
//! Role-gated operations re-verify the caller's role against the identity
//! directory on every call, so a tampered or stale claim buys nothing.

use anyhow::{Context, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — identity-provider user id
    pub sub: String,
    /// User email
    pub email: String,
    /// User display name
    pub name: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Encode a JWT token for the given user.
///
/// Uses HS256 signing with the provided secret.
pub fn encode_jwt(
    user_id: &str,
    email: &str,
    name: &str,
    secret: &str,
    expiry_secs: u64,
) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        iat: now,
        exp: now + expiry_secs as i64,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to encode JWT")
}

/// Decode and validate a JWT token.
///
/// Returns the claims if the token is valid, not expired, and
/// signed with the correct secret.
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims> {
    let token_data: TokenData<Claims> = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .context("Failed to decode JWT")?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-minimum-32-chars!!";

    #[test]
    fn test_encode_decode_roundtrip() {
        let token = encode_jwt("exec-42", "alice@example.com", "Alice", TEST_SECRET, 3600)
            .expect("encode should succeed");

        let claims = decode_jwt(&token, TEST_SECRET).expect("decode should succeed");
        assert_eq!(claims.sub, "exec-42");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.name, "Alice");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "exec-42".to_string(),
            email: "bob@example.com".to_string(),
            name: "Bob".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };

        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .expect("encode should succeed");

        assert!(decode_jwt(&token, TEST_SECRET).is_err());
    }

    #[test]
    fn test_invalid_secret_rejected() {
        let token = encode_jwt("exec-42", "c@example.com", "Charlie", TEST_SECRET, 3600)
            .expect("encode should succeed");
        assert!(decode_jwt(&token, "wrong-secret-that-is-also-32chars!").is_err());
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert!(decode_jwt("not.a.valid.jwt", TEST_SECRET).is_err());
        assert!(decode_jwt("", TEST_SECRET).is_err());
    }

    #[test]
    fn test_claims_never_carry_a_role() {
        // The wire shape must not grow a role field silently; roles are
        // resolved from the directory per call.
        let token = encode_jwt("exec-42", "a@example.com", "A", TEST_SECRET, 3600).unwrap();
        let claims = decode_jwt(&token, TEST_SECRET).unwrap();
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("role").is_none());
    }
}
