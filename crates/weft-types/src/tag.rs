//! Hashtags: normalization and extraction from post text.
//!
//! A hashtag token is `#` followed by one or more alphanumeric or `_`
//! characters, and only counts when the `#` does not continue a word
//! (`a#b` is not a tag). The slug is the lowercased token; the display name
//! keeps the author's casing from the first occurrence.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Longest accepted slug, in characters.
pub const MAX_TAG_LEN: usize = 64;

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Normalized hashtag key: lowercase, no leading `#`, path-safe.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagSlug(String);

impl TagSlug {
    /// Normalize user input (`"#World"`, `"world"`, `" World "`) into a slug.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let trimmed = raw.trim();
        let token = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if token.is_empty() {
            return Err(TypeError::InvalidTag {
                tag: raw.to_string(),
                reason: "tag must not be empty".into(),
            });
        }
        if let Some(bad) = token.chars().find(|c| !is_tag_char(*c)) {
            return Err(TypeError::InvalidTag {
                tag: raw.to_string(),
                reason: format!("contains forbidden character: {bad:?}"),
            });
        }
        if token.chars().count() > MAX_TAG_LEN {
            return Err(TypeError::InvalidTag {
                tag: raw.to_string(),
                reason: format!("longer than {MAX_TAG_LEN} characters"),
            });
        }
        Ok(Self(token.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TagSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagSlug(#{})", self.0)
    }
}

impl fmt::Display for TagSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TagSlug {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TagSlug> for String {
    fn from(slug: TagSlug) -> Self {
        slug.0
    }
}

/// A hashtag as attached to a post.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub slug: TagSlug,
    pub name: String,
}

impl Tag {
    /// Build a tag from a raw token, keeping its casing as the display name.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let slug = TagSlug::parse(raw)?;
        let trimmed = raw.trim();
        let name = trimmed.strip_prefix('#').unwrap_or(trimmed).to_string();
        Ok(Self { slug, name })
    }
}

/// Extract hashtags from post text, deduplicated by slug in order of first
/// appearance. Over-long tokens are skipped.
pub fn extract_tags(text: &str) -> Vec<Tag> {
    let chars: Vec<char> = text.chars().collect();
    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let starts_tag = chars[i] == '#' && (i == 0 || !is_tag_char(chars[i - 1]));
        if !starts_tag {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < chars.len() && is_tag_char(chars[end]) {
            end += 1;
        }
        if end > start {
            let token: String = chars[start..end].iter().collect();
            if let Ok(tag) = Tag::parse(&token) {
                if seen.insert(tag.slug.clone()) {
                    tags.push(tag);
                }
            }
        }
        i = end.max(i + 1);
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn slugs(text: &str) -> Vec<String> {
        extract_tags(text)
            .into_iter()
            .map(|t| t.slug.as_str().to_string())
            .collect()
    }

    #[test]
    fn extracts_single_tag() {
        let tags = extract_tags("hello #world");
        assert_eq!(
            tags,
            vec![Tag {
                slug: TagSlug::parse("world").unwrap(),
                name: "world".into()
            }]
        );
    }

    #[test]
    fn deduplicates_by_slug_keeping_first_name() {
        let tags = extract_tags("#Rust is #rust and #RUST");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "Rust");
        assert_eq!(tags[0].slug.as_str(), "rust");
    }

    #[test]
    fn ignores_hash_inside_words_and_bare_hashes() {
        assert!(slugs("issue a#b and # alone and ##").is_empty());
    }

    #[test]
    fn stops_at_punctuation() {
        assert_eq!(slugs("#one, #two! (#three)"), vec!["one", "two", "three"]);
    }

    #[test]
    fn unicode_tags() {
        assert_eq!(slugs("#Ümlaut"), vec!["ümlaut"]);
    }

    #[test]
    fn parse_rejects_empty_and_malformed() {
        assert!(TagSlug::parse("#").is_err());
        assert!(TagSlug::parse("   ").is_err());
        assert!(TagSlug::parse("two words").is_err());
        assert!(TagSlug::parse("a/b").is_err());
    }

    #[test]
    fn parse_rejects_over_long() {
        let long = "a".repeat(MAX_TAG_LEN + 1);
        assert!(TagSlug::parse(&long).is_err());
        assert!(extract_tags(&format!("#{long}")).is_empty());
    }

    #[test]
    fn tag_serde_shape() {
        let tag = Tag::parse("#World").unwrap();
        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json, serde_json::json!({"slug": "world", "name": "World"}));
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(token in "[A-Za-z0-9_]{1,40}") {
            let once = TagSlug::parse(&token).unwrap();
            let twice = TagSlug::parse(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn extracted_slugs_are_unique(text in "[a-c #]{0,60}") {
            let found = slugs(&text);
            let unique: HashSet<_> = found.iter().collect();
            prop_assert_eq!(found.len(), unique.len());
        }
    }
}
