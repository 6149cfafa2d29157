use serde::{Deserialize, Serialize};

use crate::user::UserPub;

/// A user's self-published profile.
///
/// Mutable and owned by its subject; everyone else only ever holds a cached
/// snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "pub")]
    pub user: UserPub,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_ref: Option<String>,
    #[serde(default)]
    pub bio: String,
}

impl Profile {
    /// A profile with only a display name.
    pub fn new(user: UserPub, display_name: impl Into<String>) -> Self {
        Self {
            user,
            display_name: display_name.into(),
            avatar_ref: None,
            bio: String::new(),
        }
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = bio.into();
        self
    }

    pub fn with_avatar(mut self, avatar_ref: impl Into<String>) -> Self {
        self.avatar_ref = Some(avatar_ref.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape() {
        let user = UserPub::from_raw([4; 32]);
        let profile = Profile::new(user, "Ada").with_bio("engines");
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["pub"], serde_json::Value::String(user.to_hex()));
        assert_eq!(json["displayName"], "Ada");
        assert_eq!(json["bio"], "engines");
        assert!(json.get("avatarRef").is_none());
    }

    #[test]
    fn missing_bio_defaults_to_empty() {
        let user = UserPub::from_raw([4; 32]);
        let json = serde_json::json!({"pub": user.to_hex(), "displayName": "Ada"});
        let profile: Profile = serde_json::from_value(json).unwrap();
        assert_eq!(profile.bio, "");
        assert_eq!(profile.avatar_ref, None);
    }
}
