use std::sync::RwLock;

use weft_types::UserPub;

/// Source of the current authenticated identity.
///
/// All self-attributed writes (publish, delete, like, repost, profile
/// update) are made under the key this returns.
pub trait IdentityProvider: Send + Sync {
    /// The authenticated public key, or `None` when signed out.
    fn current(&self) -> Option<UserPub>;

    /// Presence check.
    fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }
}

/// Ed25519 signing key (private).
pub struct SigningKey(ed25519_dalek::SigningKey);

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Parse a hex-encoded 32-byte secret.
    pub fn from_hex(s: &str) -> Result<Self, IdentityError> {
        let bytes = hex::decode(s.trim()).map_err(|_| IdentityError::InvalidKey)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| IdentityError::InvalidKey)?;
        Ok(Self::from_bytes(arr))
    }

    /// Hex-encoded secret, for persisting the key locally.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// The public key this secret signs for.
    pub fn user_pub(&self) -> UserPub {
        UserPub::from_raw(self.0.verifying_key().to_bytes())
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey(<redacted>)")
    }
}

/// Local key-holding identity. Signed out until a key is loaded.
#[derive(Debug, Default)]
pub struct KeyIdentity {
    key: RwLock<Option<SigningKey>>,
}

impl KeyIdentity {
    /// An identity with no key loaded.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An identity signed in with `key`.
    pub fn with_key(key: SigningKey) -> Self {
        Self {
            key: RwLock::new(Some(key)),
        }
    }

    /// An identity signed in with a freshly generated key.
    pub fn generate() -> Self {
        Self::with_key(SigningKey::generate())
    }

    /// Sign in, replacing any loaded key. Returns the new public key.
    pub fn login(&self, key: SigningKey) -> UserPub {
        let user = key.user_pub();
        *self.key.write().expect("identity lock poisoned") = Some(key);
        user
    }

    /// Sign out.
    pub fn logout(&self) {
        *self.key.write().expect("identity lock poisoned") = None;
    }

    /// Hex-encoded secret of the loaded key, if any.
    pub fn export_secret(&self) -> Option<String> {
        self.key
            .read()
            .expect("identity lock poisoned")
            .as_ref()
            .map(SigningKey::to_hex)
    }
}

impl IdentityProvider for KeyIdentity {
    fn current(&self) -> Option<UserPub> {
        self.key
            .read()
            .expect("identity lock poisoned")
            .as_ref()
            .map(SigningKey::user_pub)
    }
}

/// Errors from identity operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid key")]
    InvalidKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_is_not_authenticated() {
        let identity = KeyIdentity::anonymous();
        assert!(!identity.is_authenticated());
        assert_eq!(identity.current(), None);
    }

    #[test]
    fn login_and_logout() {
        let identity = KeyIdentity::anonymous();
        let key = SigningKey::generate();
        let expected = key.user_pub();
        assert_eq!(identity.login(key), expected);
        assert_eq!(identity.current(), Some(expected));
        identity.logout();
        assert!(!identity.is_authenticated());
    }

    #[test]
    fn generated_keys_are_distinct() {
        let a = SigningKey::generate();
        let b = SigningKey::generate();
        assert_ne!(a.user_pub(), b.user_pub());
        assert_ne!(a.to_hex(), b.to_hex());
    }

    #[test]
    fn secret_hex_roundtrip() {
        let key = SigningKey::generate();
        let restored = SigningKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key.user_pub(), restored.user_pub());
    }

    #[test]
    fn same_secret_same_user() {
        let a = SigningKey::from_bytes([5; 32]);
        let b = SigningKey::from_bytes([5; 32]);
        assert_eq!(a.user_pub(), b.user_pub());
    }

    #[test]
    fn rejects_bad_secret() {
        assert_eq!(SigningKey::from_hex("abcd").unwrap_err(), IdentityError::InvalidKey);
        assert_eq!(SigningKey::from_hex("zz").unwrap_err(), IdentityError::InvalidKey);
    }

    #[test]
    fn generated_identities_differ() {
        assert_ne!(
            KeyIdentity::generate().current(),
            KeyIdentity::generate().current()
        );
    }

    #[test]
    fn export_matches_loaded_key() {
        let identity = KeyIdentity::with_key(SigningKey::from_bytes([3; 32]));
        assert_eq!(identity.export_secret(), Some(hex::encode([3u8; 32])));
    }

    #[test]
    fn debug_redacts_secret() {
        let key = SigningKey::from_bytes([1; 32]);
        assert_eq!(format!("{key:?}"), "SigningKey(<redacted>)");
    }
}
