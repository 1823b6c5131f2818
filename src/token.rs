//! Opaque bearer tokens.
//!
//! A token is 32 random bytes rendered as unpadded RFC 4648 base32. Only the
//! SHA-256 of that text is persisted; the plain text is handed to the client
//! once and never stored.

use std::sync::Arc;

use base32::Alphabet;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::clock::Clock;
use crate::crypto::CryptoError;
use crate::identity::Identity;
use crate::store::{StoreError, TokenStore};
use crate::user::UserId;

/// Random bytes per token.
pub const TOKEN_BYTES: usize = 32;
/// Length of the plain text form, `ceil(32 * 8 / 5)`.
pub const TOKEN_LENGTH: usize = 52;

const ALPHABET: Alphabet = Alphabet::Rfc4648 { padding: false };

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Authentication,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Authentication => "authentication",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SHA-256 of a token's plain text.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenHash([u8; 32]);

impl TokenHash {
    pub fn of(plain: &str) -> Self {
        Self(Sha256::digest(plain.as_bytes()).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for TokenHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// A freshly minted token.
#[derive(Clone)]
pub struct Token {
    pub plain: Zeroizing<String>,
    pub hash: TokenHash,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub scope: Scope,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("plain", &"[REDACTED]")
            .field("hash", &self.hash)
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Issues and resolves bearer tokens.
#[derive(Clone)]
pub struct TokenManager {
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenManager {
    /// Create a new [`TokenManager`] issuing tokens valid for `ttl`.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { ttl, clock }
    }

    /// Mint an authentication token with the configured lifetime.
    pub fn issue(&self, user_id: UserId) -> Result<Token, CryptoError> {
        self.make_token(user_id, self.ttl, Scope::Authentication)
    }

    /// Mint a token expiring `ttl` from now.
    ///
    /// Fails if the OS random source cannot provide bytes.
    pub fn make_token(
        &self,
        user_id: UserId,
        ttl: Duration,
        scope: Scope,
    ) -> Result<Token, CryptoError> {
        let mut bytes = Zeroizing::new([0u8; TOKEN_BYTES]);
        OsRng.try_fill_bytes(&mut bytes[..])?;

        let plain = Zeroizing::new(base32::encode(ALPHABET, &bytes[..]));
        let hash = TokenHash::of(&plain);

        Ok(Token {
            plain,
            hash,
            user_id,
            expires_at: self.clock.now() + ttl,
            scope,
        })
    }

    /// Resolve a presented token to the identity owning it.
    ///
    /// Unknown, expired or wrongly scoped tokens resolve to
    /// [`Identity::Anonymous`]. Only store failures are errors.
    pub async fn resolve<S: TokenStore + ?Sized>(
        &self,
        store: &S,
        plain: &str,
        scope: Scope,
    ) -> Result<Identity, StoreError> {
        if plain.len() != TOKEN_LENGTH {
            return Ok(Identity::Anonymous);
        }

        let owner = store
            .find_active_token_owner(&TokenHash::of(plain), scope, self.clock.now())
            .await?;

        Ok(owner.map_or(Identity::Anonymous, Identity::Authenticated))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::clock::FixedClock;
    use crate::crypto::PasswordHash;
    use crate::store::UserStore;
    use crate::store::memory::MemoryStore;
    use crate::user::NewUser;

    fn manager() -> (TokenManager, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        (TokenManager::new(Duration::hours(24), clock.clone()), clock)
    }

    #[test]
    fn test_plain_text_shape() {
        let (tokens, _) = manager();
        let token = tokens.issue(UserId(1)).unwrap();

        assert_eq!(token.plain.len(), TOKEN_LENGTH);
        assert!(
            token
                .plain
                .chars()
                .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c))
        );
        assert_eq!(token.hash, TokenHash::of(&token.plain));
        assert_eq!(token.scope, Scope::Authentication);
    }

    #[test]
    fn test_hashes_are_distinct() {
        let (tokens, _) = manager();
        let hashes: HashSet<_> = (0..10_000)
            .map(|_| tokens.issue(UserId(1)).unwrap().hash)
            .collect();

        assert_eq!(hashes.len(), 10_000);
    }

    #[test]
    fn test_expiry_is_relative_to_clock() {
        let (tokens, clock) = manager();
        let token = tokens
            .make_token(UserId(1), Duration::minutes(5), Scope::Authentication)
            .unwrap();

        assert_eq!(token.expires_at, clock.now() + Duration::minutes(5));
    }

    #[test]
    fn test_debug_is_redacted() {
        let (tokens, _) = manager();
        let token = tokens.issue(UserId(1)).unwrap();

        assert!(!format!("{token:?}").contains(token.plain.as_str()));
    }

    #[tokio::test]
    async fn test_resolve_until_expiry() {
        let (tokens, clock) = manager();
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password: PasswordHash::from_phc("phc"),
            })
            .await
            .unwrap();

        let token = tokens.issue(user.id).unwrap();
        store
            .store_token(&token.hash, user.id, token.expires_at, token.scope)
            .await
            .unwrap();

        let identity = tokens
            .resolve(&store, &token.plain, Scope::Authentication)
            .await
            .unwrap();
        assert_eq!(identity.user_id(), Some(user.id));

        clock.set(token.expires_at - Duration::milliseconds(1));
        let identity = tokens
            .resolve(&store, &token.plain, Scope::Authentication)
            .await
            .unwrap();
        assert!(identity.is_authenticated());

        clock.set(token.expires_at);
        let identity = tokens
            .resolve(&store, &token.plain, Scope::Authentication)
            .await
            .unwrap();
        assert!(!identity.is_authenticated());
    }

    #[tokio::test]
    async fn test_resolve_unknown_token() {
        let (tokens, _) = manager();
        let store = MemoryStore::new();
        let unknown = tokens.issue(UserId(1)).unwrap();

        for plain in [unknown.plain.as_str(), "", "short", &"A".repeat(500)] {
            let identity = tokens
                .resolve(&store, plain, Scope::Authentication)
                .await
                .unwrap();
            assert!(!identity.is_authenticated());
        }
    }
}
