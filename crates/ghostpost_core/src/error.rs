//! Error types for the publish engine.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for publish operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors that can occur while publishing a document.
#[derive(Error, Debug)]
pub enum PublishError {
    /// Network or transport error. Never retried.
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered with something other than JSON.
    #[error("ghost API error: {0}")]
    Api(String),

    /// The API answered with an error status.
    #[error("request failed with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// What the server sent back.
        body: ResponseBody,
    },

    /// A JSON body could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A create or update call returned no posts.
    #[error("{operation} returned no posts: {body}")]
    EmptyResult {
        /// Which write produced the empty result.
        operation: WriteKind,
        /// What the server sent back instead.
        body: ResponseBody,
    },

    /// A post could not be fetched by id.
    #[error("post {0} not found")]
    PostNotFound(String),

    /// A declared tier matched no remote tier name or slug.
    #[error("unknown tier {tier:?} (available: {known:?})")]
    UnknownTier {
        /// The declared tier that failed to resolve.
        tier: String,
        /// Names of every tier the backend knows.
        known: Vec<String>,
    },

    /// The tier directory could not be listed.
    #[error("could not fetch tiers: {0}")]
    TierListing(#[source] Box<PublishError>),

    /// An image upload was rejected.
    #[error("image upload failed: {0}")]
    Upload(String),

    /// The local document is malformed.
    #[error("invalid document {}: {message}", path.display())]
    InvalidDocument {
        /// Path of the document.
        path: PathBuf,
        /// What is wrong with it.
        message: String,
    },

    /// Front matter could not be encoded or decoded.
    #[error("front matter error: {0}")]
    FrontMatter(#[from] serde_yaml::Error),

    /// Markdown rendering failed.
    #[error("render error: {0}")]
    Render(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The post was written but could not be re-fetched afterwards.
    #[error("post {post_id} was saved but could not be re-fetched: {source}")]
    Reconcile {
        /// Id of the post that now exists remotely.
        post_id: String,
        /// The fetch failure.
        #[source]
        source: Box<PublishError>,
    },
}

impl PublishError {
    /// Creates an invalid document error.
    pub fn invalid_document(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Returns true if the engine may downgrade this error to a warning.
    ///
    /// Only failures of best-effort steps qualify: listing the author
    /// directory and uploading a single asset.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            PublishError::Transport(_)
                | PublishError::Api(_)
                | PublishError::Status { .. }
                | PublishError::Protocol(_)
                | PublishError::Upload(_)
                | PublishError::Io(_)
        )
    }
}

/// The two write calls of the upsert protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// Creating a new post.
    Create,
    /// Updating an existing post.
    Update,
}

impl fmt::Display for WriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteKind::Create => f.write_str("create"),
            WriteKind::Update => f.write_str("update"),
        }
    }
}

/// A response body kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The body decoded as JSON.
    Structured(serde_json::Value),
    /// The body was not JSON.
    Raw(String),
    /// Nothing was sent back.
    Empty,
}

impl ResponseBody {
    /// Classifies raw response bytes.
    pub fn from_bytes(raw: &[u8]) -> Self {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return ResponseBody::Empty;
        }
        match serde_json::from_slice(raw) {
            Ok(value) => ResponseBody::Structured(value),
            Err(_) => ResponseBody::Raw(String::from_utf8_lossy(raw).trim().to_string()),
        }
    }
}

impl fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Structured(value) => write!(f, "ghost API error: {value}"),
            ResponseBody::Raw(text) => write!(f, "ghost API raw: {text}"),
            ResponseBody::Empty => f.write_str("ghost API returned empty posts array"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degradable_errors() {
        assert!(PublishError::Transport("connection reset".into()).is_degradable());
        assert!(PublishError::Upload("status code 413".into()).is_degradable());
        assert!(!PublishError::PostNotFound("abc".into()).is_degradable());
        assert!(PublishError::Status {
            status: 500,
            body: ResponseBody::Empty
        }
        .is_degradable());
        assert!(!PublishError::UnknownTier {
            tier: "x".into(),
            known: vec![]
        }
        .is_degradable());
    }

    #[test]
    fn response_body_classification() {
        let body = ResponseBody::from_bytes(br#"{"errors":[{"message":"nope"}]}"#);
        assert!(matches!(body, ResponseBody::Structured(_)));
        assert!(body.to_string().contains("nope"));

        let body = ResponseBody::from_bytes(b"  <html>Bad Gateway</html>\n");
        assert_eq!(body, ResponseBody::Raw("<html>Bad Gateway</html>".into()));

        assert_eq!(ResponseBody::from_bytes(b"\n"), ResponseBody::Empty);
    }

    #[test]
    fn error_display() {
        let err = PublishError::UnknownTier {
            tier: "unknown-x".into(),
            known: vec!["Gold".into(), "Free".into()],
        };
        let text = err.to_string();
        assert!(text.contains("unknown-x"));
        assert!(text.contains("Gold"));

        let err = PublishError::EmptyResult {
            operation: WriteKind::Update,
            body: ResponseBody::Empty,
        };
        assert_eq!(
            err.to_string(),
            "update returned no posts: ghost API returned empty posts array"
        );

        let err = PublishError::Status {
            status: 401,
            body: ResponseBody::from_bytes(br#"{"errors":[{"type":"UnauthorizedError"}]}"#),
        };
        assert!(err.to_string().starts_with("request failed with status 401: "));
        assert!(err.to_string().contains("UnauthorizedError"));

        let err = PublishError::invalid_document("/tmp/post.md", "missing title");
        assert_eq!(err.to_string(), "invalid document /tmp/post.md: missing title");
    }
}
