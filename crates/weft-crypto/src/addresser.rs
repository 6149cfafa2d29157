use weft_types::{Post, PostId, UserPub};

/// The immutable fields a post's identity is derived from.
///
/// Field order is fixed by [`ContentAddresser::compute`], so however a
/// caller assembles these values the resulting id is the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PostFields<'a> {
    pub author_pub: &'a UserPub,
    pub text: &'a str,
    pub timestamp: i64,
    pub reply_to: Option<&'a PostId>,
    pub media_ref: Option<&'a str>,
}

impl<'a> From<&'a Post> for PostFields<'a> {
    fn from(post: &'a Post) -> Self {
        Self {
            author_pub: &post.author_pub,
            text: &post.text,
            timestamp: post.timestamp,
            reply_to: post.reply_to.as_ref(),
            media_ref: post.media_ref.as_deref(),
        }
    }
}

/// Domain-separated BLAKE3 content addresser.
///
/// Each addresser carries a domain tag that is prepended to every hash
/// computation, so a post and a media blob with identical bytes never share
/// an address. Post fields are framed with their name and length, which
/// keeps distinct field tuples from colliding by concatenation.
pub struct ContentAddresser {
    domain: &'static str,
}

impl ContentAddresser {
    /// Addresser for post payloads.
    pub const POST: Self = Self {
        domain: "weft-post-v1",
    };
    /// Addresser for media references.
    pub const MEDIA: Self = Self {
        domain: "weft-media-v1",
    };

    /// Create an addresser with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        *hasher.finalize().as_bytes()
    }

    /// Derive a post id from its canonicalized fields.
    pub fn compute(&self, fields: &PostFields<'_>) -> PostId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        frame(&mut hasher, "authorPub", Some(&fields.author_pub.as_bytes()[..]));
        frame(&mut hasher, "text", Some(fields.text.as_bytes()));
        frame(&mut hasher, "timestamp", Some(&fields.timestamp.to_be_bytes()[..]));
        frame(&mut hasher, "replyTo", fields.reply_to.map(|id| &id.as_bytes()[..]));
        frame(&mut hasher, "mediaRef", fields.media_ref.map(str::as_bytes));
        PostId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Returns `true` if the post's id matches its fields.
    pub fn verify(&self, post: &Post) -> bool {
        self.compute(&PostFields::from(post)) == post.id
    }

    /// The domain tag used by this addresser.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// `name` `=` `len` `bytes` for present fields, `name` `~` for absent ones.
fn frame(hasher: &mut blake3::Hasher, name: &str, value: Option<&[u8]>) {
    hasher.update(name.as_bytes());
    match value {
        Some(bytes) => {
            hasher.update(b"=");
            hasher.update(&(bytes.len() as u64).to_be_bytes());
            hasher.update(bytes);
        }
        None => {
            hasher.update(b"~");
        }
    }
}
