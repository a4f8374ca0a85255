//! # Ghostpost Core
//!
//! Publish synchronization engine for Ghost.
//!
//! This crate provides:
//! - Markdown documents with YAML front matter (read, atomic write-back)
//! - Body fingerprinting to skip unchanged publishes
//! - Content-addressed upload cache for local images
//! - Author and tier resolution against the Admin API directories
//! - Create-or-update with the optimistic concurrency token
//! - Reconciliation of server-assigned fields into the front matter
//!
//! ## Architecture
//!
//! A publish is a single blocking pass:
//! 1. Skip when the stored fingerprint matches the body
//! 2. Upload local images and render the rewritten body
//! 3. Resolve authors and tiers, then create or update the post
//! 4. Fetch the post back and write changed fields to disk
//!
//! The HTTP stack is injected through [`HttpClient`], so the same
//! [`GhostClient`] runs against a real server or [`FakeGhost`].
//!
//! ## Key Invariants
//!
//! - A document without `post_id` always takes the create path
//! - Identical asset bytes are uploaded at most once per publish
//! - An unknown tier aborts before any remote mutation
//! - The front matter is written back only when something changed

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod directory;
mod document;
mod engine;
mod error;
mod fake;
mod fingerprint;
mod http;
mod media;
mod model;
mod reconcile;
mod render;
mod transport;
mod upsert;

pub use config::{normalize_api_url, PublishConfig, DEFAULT_TIMEOUT};
pub use directory::{AuthorIndex, DirectoryResolver, TierIndex};
pub use document::{Document, Metadata};
pub use engine::{PublishOutcome, PublishPhase, PublishReport, PublishStats, Publisher};
pub use error::{PublishError, PublishResult, ResponseBody, WriteKind};
pub use fake::{FakeGhost, Recorded};
pub use fingerprint::{fingerprint, is_current};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, MultipartForm, RequestBody};
pub use media::{MediaRewriter, MediaStats, UploadCache};
pub use model::{AuthorRef, Post, PostStatus, TagRef, TierRef, Visibility};
pub use reconcile::{reconcile, ChangedField, Reconciliation};
pub use render::{MarkdownRenderer, Renderer};
pub use transport::{GhostBackend, GhostClient, WriteResponse, ACCEPT_VERSION};
pub use upsert::{upsert, Upserted};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
