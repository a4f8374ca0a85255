//! Local Markdown documents with YAML front matter.
//!
//! ## File Format
//!
//! ```text
//! ---
//! title: Hello
//! post_id: 64f0c0ffee
//! ---
//!
//! Body text...
//! ```
//!
//! The body is every byte after the closing delimiter line. On write-back
//! leading newlines are stripped from the body and exactly one blank line
//! separates it from the front matter. Fingerprints are taken over the
//! body in that written form, so a write-back never changes the digest.

use crate::error::{PublishError, PublishResult};
use crate::fingerprint;
use crate::model::{blank_as_none, PostStatus, Visibility};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const DELIMITER: &str = "---";

/// Front matter of a document.
///
/// Fields are written back in declaration order; unknown keys are kept
/// in `extra` and written after the known ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Post title. Required.
    #[serde(default)]
    pub title: String,
    /// URL slug.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub slug: Option<String>,
    /// Desired status; absent means draft.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<PostStatus>,
    /// Publish timestamp as last reported by the backend.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<String>,
    /// Audience.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub visibility: Option<Visibility>,
    /// Tier names or slugs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiers: Vec<String>,
    /// Featured flag.
    #[serde(default, skip_serializing_if = "is_false")]
    pub featured: bool,
    /// Excerpt.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_excerpt: Option<String>,
    /// Author names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    /// Theme template.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_template: Option<String>,
    /// Feature image reference.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub feature_image: Option<String>,
    /// Tag names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Remote id, set after the first successful create.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub post_id: Option<String>,
    /// Fingerprint of the body at the last publish.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub hash: Option<String>,
    /// Keys this tool does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Metadata {
    /// Returns the status to send, defaulting to draft.
    pub fn effective_status(&self) -> PostStatus {
        self.status.unwrap_or_default()
    }

    /// Returns true if this document has been published before.
    pub fn is_published(&self) -> bool {
        self.post_id.is_some()
    }
}

/// A document loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    path: PathBuf,
    /// Parsed front matter.
    pub metadata: Metadata,
    /// Raw Markdown body.
    pub body: String,
}

impl Document {
    /// Creates a document in memory.
    pub fn new(path: impl Into<PathBuf>, metadata: Metadata, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            metadata,
            body: body.into(),
        }
    }

    /// Reads and parses the document at `path`.
    pub fn read(path: impl AsRef<Path>) -> PublishResult<Self> {
        let path = path.as_ref();
        let raw = fs::read(path)?;
        let text = String::from_utf8(raw)
            .map_err(|_| PublishError::invalid_document(path, "file is not valid UTF-8"))?;
        Self::parse(path, &text)
    }

    /// Parses document text.
    pub fn parse(path: impl AsRef<Path>, text: &str) -> PublishResult<Self> {
        let path = path.as_ref();
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let (yaml, body) = split_front_matter(text)
            .ok_or_else(|| PublishError::invalid_document(path, "missing front matter block"))?
            .map_err(|message| PublishError::invalid_document(path, message))?;

        let metadata: Metadata = serde_yaml::from_str(yaml).map_err(|e| {
            PublishError::invalid_document(path, format!("bad front matter: {e}"))
        })?;
        if metadata.title.trim().is_empty() {
            return Err(PublishError::invalid_document(path, "title is required"));
        }

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            body: body.to_string(),
        })
    }

    /// Returns the document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the directory relative asset paths resolve against.
    pub fn base_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
    }

    /// Returns the body as [`Document::to_text`] emits it: one separator
    /// newline followed by the body without its leading newlines.
    pub fn canonical_body(&self) -> Cow<'_, str> {
        let trimmed = self.body.trim_start_matches('\n');
        if trimmed.len() + 1 == self.body.len() {
            Cow::Borrowed(&self.body)
        } else {
            Cow::Owned(format!("\n{trimmed}"))
        }
    }

    /// Returns the fingerprint of the canonical body.
    pub fn fingerprint(&self) -> String {
        fingerprint::fingerprint(self.canonical_body().as_bytes())
    }

    /// Returns true if the document was published and its body has not
    /// changed since. A document without a remote id is never unchanged.
    pub fn is_unchanged(&self) -> bool {
        self.metadata.is_published()
            && fingerprint::is_current(
                self.metadata.hash.as_deref(),
                self.canonical_body().as_bytes(),
            )
    }

    /// Serializes the document back to its file format.
    pub fn to_text(&self) -> PublishResult<String> {
        let yaml = serde_yaml::to_string(&self.metadata)?;
        let body = self.canonical_body();

        let mut out = String::with_capacity(yaml.len() + body.len() + 10);
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(&yaml);
        if !yaml.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(&body);
        Ok(out)
    }

    /// Writes the document to its path atomically.
    ///
    /// Uses write-then-rename in the same directory so an interrupted
    /// write never leaves a truncated front matter block behind.
    pub fn write(&self) -> PublishResult<()> {
        let text = self.to_text()?;
        let dir = self.base_dir();
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| PublishError::invalid_document(&self.path, "path has no file name"))?;
        let temp_path = dir.join(format!(".{}.tmp", file_name.to_string_lossy()));

        let mut file = File::create(&temp_path)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        sync_directory(dir)
    }
}

/// Splits text into (front matter, body).
///
/// Returns `None` when the text does not open with a delimiter line and
/// `Some(Err)` when the block is never closed.
fn split_front_matter(text: &str) -> Option<Result<(&str, &str), &'static str>> {
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != DELIMITER {
        return None;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == DELIMITER || trimmed == "..." {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            return Some(Ok((yaml, body)));
        }
        offset += line.len();
    }
    Some(Err("front matter block is not closed"))
}

#[cfg(unix)]
fn sync_directory(dir: &Path) -> PublishResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> PublishResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "---\ntitle: Hello World\nstatus: published\ntiers:\n  - Gold\nauthors:\n  - Ada Lovelace\npost_id: p1\nhash: abc\n---\n\n# Heading\n\nBody text.\n";

    #[test]
    fn parses_metadata_and_body() {
        let doc = Document::parse("post.md", SAMPLE).unwrap();
        assert_eq!(doc.metadata.title, "Hello World");
        assert_eq!(doc.metadata.status, Some(PostStatus::Published));
        assert_eq!(doc.metadata.tiers, vec!["Gold"]);
        assert_eq!(doc.metadata.authors, vec!["Ada Lovelace"]);
        assert_eq!(doc.metadata.post_id.as_deref(), Some("p1"));
        assert_eq!(doc.body, "\n# Heading\n\nBody text.\n");
    }

    #[test]
    fn blank_values_read_as_absent() {
        let doc = Document::parse("post.md", "---\ntitle: T\nstatus: \"\"\npost_id: ''\n---\nbody")
            .unwrap();
        assert_eq!(doc.metadata.status, None);
        assert_eq!(doc.metadata.effective_status(), PostStatus::Draft);
        assert_eq!(doc.metadata.post_id, None);
    }

    #[test]
    fn unquoted_numeric_id_reads_as_text() {
        let doc = Document::parse("post.md", "---\ntitle: T\npost_id: 123456\n---\nbody").unwrap();
        assert_eq!(doc.metadata.post_id.as_deref(), Some("123456"));

        let text = doc.to_text().unwrap();
        let again = Document::parse("post.md", &text).unwrap();
        assert_eq!(again.metadata.post_id.as_deref(), Some("123456"));
    }

    #[test]
    fn malformed_documents_are_rejected() {
        let missing = Document::parse("a.md", "# just markdown\n");
        assert!(matches!(missing, Err(PublishError::InvalidDocument { .. })));

        let unclosed = Document::parse("a.md", "---\ntitle: T\n\nbody\n");
        assert!(matches!(unclosed, Err(PublishError::InvalidDocument { .. })));

        let untitled = Document::parse("a.md", "---\nslug: x\n---\nbody\n");
        let err = untitled.unwrap_err();
        assert!(err.to_string().contains("title is required"));

        let bad_status = Document::parse("a.md", "---\ntitle: T\nstatus: live\n---\n");
        assert!(bad_status.unwrap_err().to_string().contains("unknown status"));
    }

    #[test]
    fn empty_body_is_allowed() {
        let doc = Document::parse("a.md", "---\ntitle: T\n---\n").unwrap();
        assert_eq!(doc.body, "");
        assert_eq!(doc.fingerprint().len(), 64);
    }

    #[test]
    fn write_back_emits_one_blank_line_and_keeps_unknown_keys() {
        let text = "---\ntitle: T\nlayout: wide\n---\n\n\n\nBody\n";
        let mut doc = Document::parse("a.md", text).unwrap();
        doc.metadata.post_id = Some("p9".into());

        let out = doc.to_text().unwrap();
        assert_eq!(out, "---\ntitle: T\npost_id: p9\nlayout: wide\n---\n\nBody\n");
    }

    #[test]
    fn fingerprint_survives_write_back_framing() {
        let tight = Document::parse("a.md", "---\ntitle: T\n---\nBody\n").unwrap();
        let spaced = Document::parse("a.md", "---\ntitle: T\n---\n\n\n\nBody\n").unwrap();
        let canonical = Document::parse("a.md", "---\ntitle: T\n---\n\nBody\n").unwrap();
        assert_eq!(tight.canonical_body(), "\nBody\n");
        assert_eq!(tight.fingerprint(), canonical.fingerprint());
        assert_eq!(spaced.fingerprint(), canonical.fingerprint());

        let reread = Document::parse("a.md", &tight.to_text().unwrap()).unwrap();
        assert_eq!(reread.body, "\nBody\n");
        assert_eq!(reread.fingerprint(), tight.fingerprint());

        let empty = Document::parse("a.md", "---\ntitle: T\n---\n").unwrap();
        let reread = Document::parse("a.md", &empty.to_text().unwrap()).unwrap();
        assert_eq!(reread.fingerprint(), empty.fingerprint());
    }

    #[test]
    fn visibility_keeps_its_written_spelling() {
        let doc = Document::parse("a.md", "---\ntitle: T\nvisibility: specific\n---\n").unwrap();
        assert_eq!(doc.metadata.visibility, Some(Visibility::Specific));
        assert!(doc.to_text().unwrap().contains("visibility: specific\n"));

        let doc = Document::parse("a.md", "---\ntitle: T\nvisibility: tiers\n---\n").unwrap();
        assert!(doc.to_text().unwrap().contains("visibility: tiers\n"));
    }

    #[test]
    fn unchanged_requires_id_and_current_hash() {
        let mut doc = Document::parse("a.md", "---\ntitle: T\n---\n\nBody\n").unwrap();
        assert!(!doc.is_unchanged());

        doc.metadata.hash = Some(doc.fingerprint());
        assert!(!doc.is_unchanged(), "no id forces a create");

        doc.metadata.post_id = Some("p1".into());
        assert!(doc.is_unchanged());

        doc.body.push_str("more\n");
        assert!(!doc.is_unchanged());
    }

    #[test]
    fn write_replaces_file_and_rereads_identically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("post.md");
        fs::write(&path, "---\ntitle: T\n---\n\nBody\n").unwrap();

        let mut doc = Document::read(&path).unwrap();
        doc.metadata.post_id = Some("p1".into());
        doc.metadata.hash = Some(doc.fingerprint());
        doc.write().unwrap();

        let reread = Document::read(&path).unwrap();
        assert_eq!(reread.metadata, doc.metadata);
        assert_eq!(reread.body, doc.body);
        assert!(reread.is_unchanged());
        assert!(!dir.path().join(".post.md.tmp").exists());
    }

    #[test]
    fn base_dir_of_bare_file_name_is_current_dir() {
        let doc = Document::parse("post.md", "---\ntitle: T\n---\n").unwrap();
        assert_eq!(doc.base_dir(), Path::new("."));

        let doc = Document::parse("posts/2026/post.md", "---\ntitle: T\n---\n").unwrap();
        assert_eq!(doc.base_dir(), Path::new("posts/2026"));
    }
}
