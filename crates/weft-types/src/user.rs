use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A user's public key.
///
/// Every self-attributed write (publish, like, repost, profile update) is
/// made under a `UserPub`. It is the raw 32-byte ed25519 verifying key,
/// serialized as 64 hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserPub([u8; 32]);

impl UserPub {
    /// Create from raw public key bytes.
    pub fn from_raw(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32-byte key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full hex-encoded string. This is the form used in paths.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short identifier (`@` + first 8 hex characters).
    pub fn short_id(&self) -> String {
        format!("@{}", hex::encode(&self.0[..4]))
    }

    /// Parse from a hex string, with or without a leading `@`.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        let s = s.strip_prefix('@').unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for UserPub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserPub({})", self.short_id())
    }
}

impl fmt::Display for UserPub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for UserPub {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for UserPub {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<UserPub> for String {
    fn from(user: UserPub) -> Self {
        user.to_hex()
    }
}
