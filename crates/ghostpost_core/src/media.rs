//! Local image upload and reference rewriting.
//!
//! Inline images `![alt](path)` whose path names a readable local file
//! are uploaded and the path is replaced with the returned URL. Uploads
//! are keyed by the SHA-256 of the file contents, so one asset is sent
//! at most once per publish no matter how many names point at it.
//!
//! A failed upload is not fatal: the reference keeps its local path and
//! the rest of the body is still rewritten. The failure is remembered
//! for the rest of the publish, so later references to the same bytes
//! stay local without another request.

use crate::fingerprint::fingerprint;
use crate::transport::GhostBackend;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Matches `![alt](target "optional title")`, capturing the target.
static IMAGE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[[^\]]*\]\(\s*([^)\s]+)[^)]*\)"#).expect("image pattern compiles")
});

/// Remote URLs keyed by asset content digest.
///
/// Lives for one publish and is never persisted.
#[derive(Debug, Default)]
pub struct UploadCache {
    by_digest: HashMap<String, String>,
    failed: HashSet<String>,
}

impl UploadCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the URL stored for a digest.
    pub fn get(&self, digest: &str) -> Option<&str> {
        self.by_digest.get(digest).map(String::as_str)
    }

    /// Records the URL of an uploaded asset.
    pub fn insert(&mut self, digest: String, url: String) {
        self.by_digest.insert(digest, url);
    }

    /// Records that uploading the asset with this digest failed.
    pub fn mark_failed(&mut self, digest: String) {
        self.failed.insert(digest);
    }

    /// Returns true if an upload of this digest already failed.
    pub fn has_failed(&self, digest: &str) -> bool {
        self.failed.contains(digest)
    }

    /// Number of distinct assets uploaded.
    pub fn len(&self) -> usize {
        self.by_digest.len()
    }

    /// Returns true if nothing has been uploaded.
    pub fn is_empty(&self) -> bool {
        self.by_digest.is_empty()
    }
}

/// Counters for one rewrite pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaStats {
    /// Assets sent to the backend.
    pub uploaded: usize,
    /// References served from the cache.
    pub reused: usize,
    /// References left local because the upload failed.
    pub failed: usize,
}

/// Uploads local images and rewrites their references.
pub struct MediaRewriter<'a, B: GhostBackend> {
    backend: &'a B,
    cache: UploadCache,
    stats: MediaStats,
}

impl<'a, B: GhostBackend> MediaRewriter<'a, B> {
    /// Creates a rewriter with an empty cache.
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            cache: UploadCache::new(),
            stats: MediaStats::default(),
        }
    }

    /// Returns the counters accumulated so far.
    pub fn stats(&self) -> MediaStats {
        self.stats
    }

    /// Returns the upload cache.
    pub fn cache(&self) -> &UploadCache {
        &self.cache
    }

    /// Rewrites every uploadable image reference in `body`.
    ///
    /// Relative paths resolve against `base_dir`.
    pub fn rewrite(&mut self, body: &str, base_dir: &Path) -> String {
        let mut out = String::with_capacity(body.len());
        let mut last = 0;

        for captures in IMAGE_REF.captures_iter(body) {
            let Some(target) = captures.get(1) else {
                continue;
            };
            out.push_str(&body[last..target.start()]);
            match self.remote_url(target.as_str(), base_dir) {
                Some(url) => out.push_str(&url),
                None => out.push_str(target.as_str()),
            }
            last = target.end();
        }

        out.push_str(&body[last..]);
        out
    }

    fn remote_url(&mut self, reference: &str, base_dir: &Path) -> Option<String> {
        if is_remote(reference) {
            return None;
        }

        let path = base_dir.join(reference);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(reference, error = %e, "not a readable local file, leaving as is");
                return None;
            }
        };

        let digest = fingerprint(&bytes);
        if let Some(url) = self.cache.get(&digest) {
            debug!(reference, url, "reusing uploaded asset");
            self.stats.reused += 1;
            return Some(url.to_string());
        }
        if self.cache.has_failed(&digest) {
            debug!(reference, "upload of these bytes already failed, keeping local reference");
            self.stats.failed += 1;
            return None;
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| reference.to_string());

        match self.backend.upload_image(&bytes, &file_name) {
            Ok(url) => {
                info!(reference, url = %url, "uploaded image");
                self.stats.uploaded += 1;
                self.cache.insert(digest, url.clone());
                Some(url)
            }
            Err(e) => {
                warn!(reference, error = %e, "image upload failed, keeping local reference");
                self.stats.failed += 1;
                self.cache.mark_failed(digest);
                None
            }
        }
    }
}

fn is_remote(reference: &str) -> bool {
    reference.contains("://") || reference.starts_with("//") || reference.starts_with("data:")
}
