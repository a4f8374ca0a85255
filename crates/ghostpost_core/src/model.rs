//! Admin API resource types.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Publication status of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Not visible on the site.
    #[default]
    Draft,
    /// Live on the site.
    Published,
    /// Will go live at `published_at`.
    Scheduled,
    /// Sent as an email-only newsletter.
    Sent,
}

impl PostStatus {
    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Sent => "sent",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "scheduled" => Ok(PostStatus::Scheduled),
            "sent" => Ok(PostStatus::Sent),
            other => Err(format!(
                "unknown status {other:?} (expected draft, published or scheduled)"
            )),
        }
    }
}

/// Who can read a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Everyone.
    Public,
    /// Any signed-in member.
    Members,
    /// Any paying member.
    Paid,
    /// Members of the tiers listed on the post.
    Tiers,
    /// Older spelling of [`Visibility::Tiers`], kept as written in
    /// documents and sent as `tiers`.
    Specific,
}

impl Visibility {
    /// Returns the value the Admin API expects.
    pub fn to_wire(self) -> Visibility {
        match self {
            Visibility::Specific => Visibility::Tiers,
            other => other,
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "members" => Ok(Visibility::Members),
            "paid" => Ok(Visibility::Paid),
            "tiers" => Ok(Visibility::Tiers),
            "specific" => Ok(Visibility::Specific),
            other => Err(format!(
                "unknown visibility {other:?} (expected public, members, paid, tiers or specific)"
            )),
        }
    }
}

/// Reference to a staff user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    /// Backend id.
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AuthorRef {
    /// Creates a reference carrying only an id.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    /// Returns the display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Reference to a membership tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRef {
    /// Backend id.
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// URL slug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl TierRef {
    /// Returns the display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Reference to a tag by name; the backend creates unknown tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    /// Tag name.
    pub name: String,
    /// URL slug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl TagRef {
    /// Wraps plain tag names.
    pub fn from_names(names: &[String]) -> Vec<TagRef> {
        names
            .iter()
            .map(|name| TagRef {
                name: name.clone(),
                slug: None,
            })
            .collect()
    }
}

/// A post as the Admin API sends and receives it.
///
/// Empty optional fields are left out of the JSON entirely, which the
/// backend reads as "leave unchanged" on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Backend id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// URL slug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Publication status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
    /// Rendered body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Feature image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_image: Option<String>,
    /// Tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagRef>,
    /// Excerpt shown in listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_excerpt: Option<String>,
    /// Publish timestamp (ISO 8601, kept opaque).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    /// Audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    /// Tiers with access.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiers: Vec<TierRef>,
    /// Featured flag.
    #[serde(default)]
    pub featured: bool,
    /// Authors in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<AuthorRef>,
    /// Theme template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_template: Option<String>,
    /// Concurrency token; must be echoed back on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Post {
    /// Prepares this post to be sent as an update of `id`.
    ///
    /// Tags and the feature image are dropped from the payload so edits
    /// made to them directly in the admin UI survive a republish.
    pub fn into_update(mut self, id: &str, concurrency_token: Option<String>) -> Post {
        self.id = Some(id.to_string());
        self.updated_at = concurrency_token;
        self.tags = Vec::new();
        self.feature_image = None;
        self
    }

    /// Canonical author names in order.
    pub fn author_names(&self) -> Vec<String> {
        self.authors
            .iter()
            .map(|a| a.display_name().to_string())
            .collect()
    }

    /// Canonical tier names in order.
    pub fn tier_names(&self) -> Vec<String> {
        self.tiers
            .iter()
            .map(|t| t.display_name().to_string())
            .collect()
    }
}

/// `{"posts": [...]}` request and response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostsEnvelope {
    /// The posts.
    #[serde(default)]
    pub posts: Vec<Post>,
}

/// `{"authors": [...]}` response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorsEnvelope {
    /// The authors.
    #[serde(default)]
    pub authors: Vec<AuthorRef>,
}

/// `{"tiers": [...]}` response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TiersEnvelope {
    /// The tiers.
    #[serde(default)]
    pub tiers: Vec<TierRef>,
}

/// `{"images": [{"url": ...}]}` response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImagesEnvelope {
    /// Uploaded images.
    #[serde(default)]
    pub images: Vec<UploadedImage>,
}

/// One uploaded image.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedImage {
    /// Public URL of the stored image.
    pub url: String,
}

/// Reads an optional value, treating a missing, null or blank string as absent.
pub(crate) fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Text(text)) => text,
        Some(Scalar::Integer(n)) => n.to_string(),
        Some(Scalar::Float(n)) => n.to_string(),
        Some(Scalar::Flag(b)) => b.to_string(),
        None => return Ok(None),
    };
    match raw.trim() {
        "" => Ok(None),
        value => value.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Unquoted YAML scalars such as all-digit ids arrive as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}
