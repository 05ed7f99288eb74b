//! Token authority — credential checks and stateless token issuance.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use crate::error::{AuthError, AuthResult};

type HmacSha256 = Hmac<Sha256>;

const MIN_ACCESS_KEY_LEN: usize = 5;
const MAX_ACCESS_KEY_LEN: usize = 20;
const MIN_SECRET_KEY_LEN: usize = 8;
const MAX_SECRET_KEY_LEN: usize = 40;

/// The cluster identity every node and operator logs in with.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Claims carried inside a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Username the token was issued to.
    pub sub: String,
    /// Unix timestamp of issuance.
    pub iat: i64,
    /// Unix timestamp after which the token is rejected.
    pub exp: i64,
}

/// Issues and validates session tokens.
///
/// Holds no mutable state: validity is a pure function of the token's
/// signature and expiry, so one authority can be shared across every
/// handler without locking.
#[derive(Debug, Clone)]
pub struct TokenAuthority {
    credentials: Credentials,
    expiry: Duration,
}

impl TokenAuthority {
    /// Create an authority for the given identity and token lifetime.
    pub fn new(credentials: Credentials, expiry: Duration) -> Self {
        Self { credentials, expiry }
    }

    /// Lifetime applied to every issued token.
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Check a username/password pair against the configured identity.
    ///
    /// Does not issue a token.
    pub fn authenticate(&self, username: &str, password: &str) -> AuthResult<()> {
        check_credential_shape(username, password)?;

        if username != self.credentials.access_key {
            return Err(AuthError::InvalidAccessKey);
        }

        // Both sides go through the same MAC so the final comparison is
        // constant-time regardless of where the secrets diverge.
        let expected = self
            .mac()?
            .chain_update(self.credentials.secret_key.as_bytes())
            .finalize()
            .into_bytes();
        self.mac()?
            .chain_update(password.as_bytes())
            .verify_slice(&expected)
            .map_err(|_| AuthError::InvalidSecretKey)
    }

    /// Issue a token for `username` valid for the configured window.
    pub fn issue_token(&self, username: &str) -> AuthResult<String> {
        self.issue_token_at(username, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (unix seconds).
    pub fn issue_token_at(&self, username: &str, now: i64) -> AuthResult<String> {
        let expiry = i64::try_from(self.expiry.as_secs())
            .map_err(|_| AuthError::Signing(format!("token expiry {:?} out of range", self.expiry)))?;
        let claims = Claims {
            sub: username.to_string(),
            iat: now,
            exp: now.saturating_add(expiry),
        };

        let payload = serde_json::to_vec(&claims).map_err(|e| AuthError::Signing(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(payload);
        let signature = self.mac()?.chain_update(payload.as_bytes()).finalize().into_bytes();

        debug!(user = %username, exp = claims.exp, "issued session token");
        Ok(format!("{payload}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Whether `token` is well-formed, correctly signed and unexpired.
    pub fn validate(&self, token: &str) -> bool {
        match self.verify(token) {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "token rejected");
                false
            }
        }
    }

    /// Verify `token` against the current time and return its claims.
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify `token` as if the current time were `now` (unix seconds).
    pub fn verify_at(&self, token: &str, now: i64) -> AuthResult<Claims> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| AuthError::Malformed("missing signature separator".to_string()))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        self.mac()?
            .chain_update(payload.as_bytes())
            .verify_slice(&signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|e| AuthError::Malformed(e.to_string()))?;

        if now >= claims.exp {
            return Err(AuthError::Expired {
                expired_at: claims.exp,
                now,
            });
        }

        Ok(claims)
    }

    fn mac(&self) -> AuthResult<HmacSha256> {
        HmacSha256::new_from_slice(self.credentials.secret_key.as_bytes())
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

fn check_credential_shape(username: &str, password: &str) -> AuthResult<()> {
    let user_len = username.chars().count();
    if !(MIN_ACCESS_KEY_LEN..=MAX_ACCESS_KEY_LEN).contains(&user_len) {
        return Err(AuthError::AccessKeyLength {
            min: MIN_ACCESS_KEY_LEN,
            max: MAX_ACCESS_KEY_LEN,
        });
    }

    let pass_len = password.chars().count();
    if !(MIN_SECRET_KEY_LEN..=MAX_SECRET_KEY_LEN).contains(&pass_len) {
        return Err(AuthError::SecretKeyLength {
            min: MIN_SECRET_KEY_LEN,
            max: MAX_SECRET_KEY_LEN,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_authority() -> TokenAuthority {
        TokenAuthority::new(
            Credentials::new("strata-admin", "correct-horse-battery"),
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn authenticate_accepts_configured_identity() {
        let auth = test_authority();
        assert!(auth.authenticate("strata-admin", "correct-horse-battery").is_ok());
    }

    #[test]
    fn authenticate_rejects_wrong_secret() {
        let auth = test_authority();
        assert_eq!(
            auth.authenticate("strata-admin", "wrong-horse-battery"),
            Err(AuthError::InvalidSecretKey)
        );
    }

    #[test]
    fn authenticate_rejects_wrong_user() {
        let auth = test_authority();
        assert_eq!(
            auth.authenticate("someone", "correct-horse-battery"),
            Err(AuthError::InvalidAccessKey)
        );
    }

    #[test]
    fn authenticate_checks_lengths_first() {
        let auth = test_authority();
        assert!(matches!(
            auth.authenticate("abc", "correct-horse-battery"),
            Err(AuthError::AccessKeyLength { .. })
        ));
        assert!(matches!(
            auth.authenticate("strata-admin", "short"),
            Err(AuthError::SecretKeyLength { .. })
        ));
    }

    #[test]
    fn issued_token_validates() {
        let auth = test_authority();
        let token = auth.issue_token("strata-admin").unwrap();
        assert!(auth.validate(&token));

        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.sub, "strata-admin");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn expired_token_rejected() {
        let auth = test_authority();
        let token = auth.issue_token_at("strata-admin", 1_000).unwrap();
        assert_eq!(
            auth.verify_at(&token, 1_000 + 3600),
            Err(AuthError::Expired {
                expired_at: 4_600,
                now: 4_600
            })
        );
        assert!(auth.verify_at(&token, 1_000 + 3599).is_ok());
        assert!(!auth.validate(&token));
    }

    #[test]
    fn zero_expiry_is_immediately_invalid() {
        let auth = TokenAuthority::new(
            Credentials::new("strata-admin", "correct-horse-battery"),
            Duration::ZERO,
        );
        let token = auth.issue_token("strata-admin").unwrap();
        assert!(!auth.validate(&token));
    }

    #[test]
    fn oversized_expiry_refuses_to_issue() {
        let auth = TokenAuthority::new(
            Credentials::new("strata-admin", "correct-horse-battery"),
            Duration::from_secs(u64::MAX),
        );
        assert!(matches!(
            auth.issue_token("strata-admin"),
            Err(AuthError::Signing(_))
        ));
    }

    #[test]
    fn long_expiry_saturates_and_validates() {
        let auth = TokenAuthority::new(
            Credentials::new("strata-admin", "correct-horse-battery"),
            Duration::from_secs(i64::MAX as u64),
        );
        let token = auth.issue_token("strata-admin").unwrap();
        assert!(auth.validate(&token));
        assert_eq!(auth.verify(&token).unwrap().exp, i64::MAX);
    }

    #[test]
    fn token_from_other_secret_rejected() {
        let auth = test_authority();
        let other = TokenAuthority::new(
            Credentials::new("strata-admin", "a-different-secret"),
            Duration::from_secs(3600),
        );
        let forged = other.issue_token("strata-admin").unwrap();
        assert_eq!(auth.verify(&forged), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn tampered_payload_rejected() {
        let auth = test_authority();
        let token = auth.issue_token("strata-admin").unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let claims = Claims {
            sub: "strata-admin".to_string(),
            iat: 0,
            exp: i64::MAX,
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let tampered = format!("{payload}.{signature}");

        assert_eq!(auth.verify(&tampered), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn garbage_tokens_rejected() {
        let auth = test_authority();
        assert!(!auth.validate(""));
        assert!(!auth.validate("no-separator"));
        assert!(!auth.validate("a.b"));
        assert!(!auth.validate("!!!.???"));
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("strata-admin", "correct-horse-battery");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("strata-admin"));
        assert!(!rendered.contains("correct-horse-battery"));
    }
}
