//! Password hashing and bearer-token signing.
//!
//! Both are narrow wrappers: `hash`/`verify` over Argon2id digests in PHC
//! string format, and `sign`/`verify` over HS256 JWTs.

use std::time::Duration;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::store::User;

/// Lifetime of an issued token.
pub const TOKEN_TTL: Duration = Duration::from_secs(60 * 60 * 24);

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("token signing failed: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
}

/// Argon2id password digests.
#[derive(Clone, Debug, Default)]
pub struct Passwords {
    argon2: Argon2<'static>,
}

impl Passwords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes `secret` with a fresh random salt.
    pub fn hash(&self, secret: &str) -> Result<String, CryptoError> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| CryptoError::Hash(e.to_string()))?;
        Ok(digest.to_string())
    }

    /// `true` when `secret` matches `digest`. A malformed digest never matches.
    pub fn verify(&self, digest: &str, secret: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) => self.argon2.verify_password(secret.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                debug!("stored password digest is malformed: {e}");
                false
            }
        }
    }
}

/// Token payload.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    pub fn user(&self) -> User {
        User { id: self.sub, email: self.email.clone() }
    }
}

/// Issues and checks HS256 tokens.
pub struct Tokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl Tokens {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn sign(&self, user: &User) -> Result<String, CryptoError> {
        let now = jsonwebtoken::get_current_timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            iat: now,
            exp: now + self.ttl.as_secs(),
        };
        Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Claims of a valid, unexpired token; `None` for anything else.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        match jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!(kind = ?e.kind(), "token rejected");
                None
            }
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively and the value must be exactly two
/// whitespace-separated parts.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User { id: 7, email: "a@b.com".into() }
    }

    #[test]
    fn password_round_trip() {
        let passwords = Passwords::new();
        let digest = passwords.hash("pw123").unwrap();
        assert!(digest.starts_with("$argon2"));
        assert!(passwords.verify(&digest, "pw123"));
        assert!(!passwords.verify(&digest, "pw124"));
        assert!(!passwords.verify("not a digest", "pw123"));
    }

    #[test]
    fn tokens_carry_the_user() {
        let tokens = Tokens::new(b"secret", TOKEN_TTL);
        let token = tokens.sign(&user()).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user(), user());
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL.as_secs());
    }

    #[test]
    fn foreign_and_expired_tokens_are_rejected() {
        let ours = Tokens::new(b"secret", TOKEN_TTL);
        let theirs = Tokens::new(b"other", TOKEN_TTL);
        assert!(ours.verify(&theirs.sign(&user()).unwrap()).is_none());
        assert!(ours.verify("garbage").is_none());

        let now = jsonwebtoken::get_current_timestamp();
        let stale = Claims { sub: 7, email: "a@b.com".into(), iat: now - 120, exp: now - 60 };
        let token = jsonwebtoken::encode(&Header::default(), &stale, &EncodingKey::from_secret(b"secret")).unwrap();
        assert!(ours.verify(&token).is_none());
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(parse_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer("bearer   abc"), Some("abc"));
        assert_eq!(parse_bearer("Basic abc"), None);
        assert_eq!(parse_bearer("Bearer"), None);
        assert_eq!(parse_bearer("Bearer a b"), None);
    }
}
