//! The publish pipeline.
//!
//! One call to [`Publisher::publish`] runs, strictly in order:
//!
//! 1. fingerprint check (skip when unchanged)
//! 2. media rewrite (one upload per unique asset)
//! 3. rendering
//! 4. directory resolution (authors, then tiers)
//! 5. create or update
//! 6. reconciliation fetch and merge
//! 7. write-back, only when something changed
//!
//! Failures before step 5 leave the backend untouched. Once step 5
//! succeeds, step 6 always runs and its failure is fatal.

use crate::config::PublishConfig;
use crate::directory::DirectoryResolver;
use crate::document::{Document, Metadata};
use crate::error::{PublishError, PublishResult, WriteKind};
use crate::media::{MediaRewriter, MediaStats};
use crate::model::{AuthorRef, Post, TagRef, TierRef, Visibility};
use crate::reconcile::{reconcile, ChangedField};
use crate::render::Renderer;
use crate::transport::GhostBackend;
use crate::upsert::upsert;
use parking_lot::RwLock;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Phase of the publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PublishPhase {
    /// Not publishing.
    #[default]
    Idle,
    /// Uploading and rewriting media references.
    Uploading,
    /// Listing authors and tiers.
    Resolving,
    /// Creating or updating the post.
    Writing,
    /// Fetching the post back and merging it into the metadata.
    Reconciling,
    /// Last publish finished, including skips.
    Done,
    /// Last publish failed.
    Failed,
}

/// Counters across publishes with one publisher.
#[derive(Debug, Clone, Default)]
pub struct PublishStats {
    /// Publishes that wrote to the backend.
    pub published: u64,
    /// Publishes skipped by fingerprint.
    pub skipped: u64,
    /// Front matter write-backs.
    pub written_back: u64,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Summary of a publish that wrote to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReport {
    /// Remote post id.
    pub post_id: String,
    /// Whether the post was created or updated.
    pub kind: WriteKind,
    /// Metadata fields overwritten by reconciliation.
    pub changed: Vec<ChangedField>,
    /// Whether the document was rewritten on disk.
    pub written_back: bool,
    /// Media counters.
    pub media: MediaStats,
    /// Body fingerprint that was published.
    pub digest: String,
    /// Wall time of the publish.
    pub duration: Duration,
}

/// Outcome of one publish.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// The body matched the stored fingerprint; nothing was sent.
    Skipped {
        /// Remote post id from the front matter.
        post_id: String,
        /// The unchanged fingerprint.
        digest: String,
    },
    /// The post was created or updated.
    Published(PublishReport),
}

impl PublishOutcome {
    /// Returns the remote post id.
    pub fn post_id(&self) -> &str {
        match self {
            PublishOutcome::Skipped { post_id, .. } => post_id,
            PublishOutcome::Published(report) => &report.post_id,
        }
    }

    /// Returns true if the publish was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, PublishOutcome::Skipped { .. })
    }
}

/// Publishes documents to one backend.
pub struct Publisher<B: GhostBackend, R: Renderer> {
    config: PublishConfig,
    backend: B,
    renderer: R,
    phase: RwLock<PublishPhase>,
    stats: RwLock<PublishStats>,
}

impl<B: GhostBackend, R: Renderer> Publisher<B, R> {
    /// Creates a publisher.
    pub fn new(config: PublishConfig, backend: B, renderer: R) -> Self {
        Self {
            config,
            backend,
            renderer,
            phase: RwLock::new(PublishPhase::Idle),
            stats: RwLock::new(PublishStats::default()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the current phase.
    pub fn phase(&self) -> PublishPhase {
        *self.phase.read()
    }

    /// Returns accumulated counters.
    pub fn stats(&self) -> PublishStats {
        self.stats.read().clone()
    }

    fn set_phase(&self, phase: PublishPhase) {
        *self.phase.write() = phase;
    }

    /// Reads the document at `path` and publishes it.
    pub fn publish(&self, path: impl AsRef<Path>) -> PublishResult<PublishOutcome> {
        let mut document = Document::read(path)?;
        self.publish_document(&mut document)
    }

    /// Publishes an already loaded document.
    ///
    /// On success `document.metadata` holds the reconciled front matter,
    /// whether or not it was written back.
    pub fn publish_document(&self, document: &mut Document) -> PublishResult<PublishOutcome> {
        let result = self.run(document);
        match &result {
            Ok(outcome) => {
                self.set_phase(PublishPhase::Done);
                let mut stats = self.stats.write();
                match outcome {
                    PublishOutcome::Skipped { .. } => stats.skipped += 1,
                    PublishOutcome::Published(report) => {
                        stats.published += 1;
                        if report.written_back {
                            stats.written_back += 1;
                        }
                    }
                }
                stats.last_error = None;
            }
            Err(e) => {
                self.set_phase(PublishPhase::Failed);
                self.stats.write().last_error = Some(e.to_string());
            }
        }
        result
    }

    fn run(&self, document: &mut Document) -> PublishResult<PublishOutcome> {
        let start = Instant::now();
        let digest = document.fingerprint();

        if document.is_unchanged() {
            let post_id = document.metadata.post_id.clone().unwrap_or_default();
            info!(path = %document.path().display(), %post_id, "no changes since last publish, skipping");
            return Ok(PublishOutcome::Skipped { post_id, digest });
        }

        self.set_phase(PublishPhase::Uploading);
        let mut rewriter = MediaRewriter::new(&self.backend);
        let body = rewriter.rewrite(&document.body, document.base_dir());
        let media = rewriter.stats();
        debug!(?media, "media rewrite finished");

        let html = self.renderer.render(&body)?;

        self.set_phase(PublishPhase::Resolving);
        let resolver = DirectoryResolver::load(&self.backend)?;
        let authors = resolver.resolve_authors(&document.metadata.authors);
        let tiers = resolver.resolve_tiers(&document.metadata.tiers)?;

        self.set_phase(PublishPhase::Writing);
        let post = build_post(&document.metadata, html, authors, tiers);
        let upserted = upsert(&self.backend, post, document.metadata.post_id.as_deref())?;

        self.set_phase(PublishPhase::Reconciling);
        let remote = self
            .backend
            .get_post(&upserted.id)
            .map_err(|e| PublishError::Reconcile {
                post_id: upserted.id.clone(),
                source: Box::new(e),
            })?;
        let reconciliation = reconcile(document.metadata.clone(), &remote, &digest);

        let mut written_back = false;
        if reconciliation.is_dirty() {
            document.metadata = reconciliation.metadata;
            if self.config.write_back {
                document.write()?;
                written_back = true;
                info!(
                    path = %document.path().display(),
                    changed = ?reconciliation.changed,
                    "updated front matter"
                );
            }
        }

        Ok(PublishOutcome::Published(PublishReport {
            post_id: upserted.id,
            kind: upserted.kind,
            changed: reconciliation.changed,
            written_back,
            media,
            digest,
            duration: start.elapsed(),
        }))
    }
}

/// Builds the outgoing post from front matter and resolved references.
fn build_post(
    metadata: &Metadata,
    html: String,
    authors: Vec<AuthorRef>,
    tiers: Vec<TierRef>,
) -> Post {
    Post {
        id: None,
        title: metadata.title.clone(),
        slug: metadata.slug.clone(),
        status: Some(metadata.effective_status()),
        html: Some(html),
        feature_image: metadata.feature_image.clone(),
        tags: TagRef::from_names(&metadata.tags),
        custom_excerpt: metadata.custom_excerpt.clone(),
        published_at: metadata.published_at.clone(),
        visibility: metadata.visibility.map(Visibility::to_wire),
        tiers,
        featured: metadata.featured,
        authors,
        custom_template: metadata.custom_template.clone(),
        updated_at: None,
    }
}
