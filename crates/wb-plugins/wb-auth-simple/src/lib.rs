//! # wb-auth-simple
//!
//! HMAC-SHA256 implementation of `AuthProvider`.
//! Tokens look like `{user_id}.{hex signature}`; the signature binds the user
//! id to the server secret, so the id cannot be swapped without the secret.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use wb_core::{AuthProvider, UserId};

type HmacSha256 = Hmac<Sha256>;

pub struct SimpleAuthProvider {
    /// Signing secret (e.g., from `WORDBOOK__AUTH__SECRET`)
    secret: SecretString,
}

impl SimpleAuthProvider {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self, user: &str) -> HmacSha256 {
        // HMAC accepts keys of any length.
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC takes keys of any size"));
        mac.update(user.as_bytes());
        mac
    }
}

impl AuthProvider for SimpleAuthProvider {
    fn issue(&self, user: &UserId) -> String {
        let signature = hex::encode(self.mac(user.as_str()).finalize().into_bytes());
        format!("{user}.{signature}")
    }

    fn resolve(&self, token: &str) -> Option<UserId> {
        let (user, signature) = token.rsplit_once('.')?;
        if user.is_empty() {
            return None;
        }
        let signature = hex::decode(signature).ok()?;
        self.mac(user).verify_slice(&signature).ok()?;
        Some(UserId::from(user))
    }
}
