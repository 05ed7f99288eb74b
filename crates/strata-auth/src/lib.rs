//! strata-auth — session tokens for the Strata control plane.
//!
//! A [`TokenAuthority`] checks operator and peer credentials against the
//! configured identity and issues short-lived, self-contained tokens.
//! Tokens are HMAC-SHA256 signed with the secret key, so validation needs
//! no server-side session table and is safe to run from any number of
//! handlers at once.
//!
//! # Token format
//!
//! ```text
//! base64url(claims json) "." base64url(hmac-sha256(secret, first part))
//! ```

pub mod error;
pub mod token;

pub use error::{AuthError, AuthResult};
pub use token::{Claims, Credentials, TokenAuthority};
