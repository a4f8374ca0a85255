//! Merging server-assigned fields back into local metadata.

use crate::document::Metadata;
use crate::model::Post;
use std::fmt;

/// A metadata field that reconciliation can overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangedField {
    /// `post_id` was empty and is now set.
    PostId,
    /// `published_at` differs from the server.
    PublishedAt,
    /// `status` differs from the server.
    Status,
    /// Canonical author names differ.
    Authors,
    /// Canonical tier names differ.
    Tiers,
    /// The stored fingerprint is stale.
    Hash,
}

impl fmt::Display for ChangedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangedField::PostId => "post_id",
            ChangedField::PublishedAt => "published_at",
            ChangedField::Status => "status",
            ChangedField::Authors => "authors",
            ChangedField::Tiers => "tiers",
            ChangedField::Hash => "hash",
        };
        f.write_str(name)
    }
}

/// Result of reconciling local metadata with the remote post.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Metadata with remote values merged in.
    pub metadata: Metadata,
    /// Fields that were overwritten, in comparison order.
    pub changed: Vec<ChangedField>,
}

impl Reconciliation {
    /// True if anything changed and the document must be written back.
    pub fn is_dirty(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Merges the authoritative `remote` post into `local`.
///
/// Compares id (only filled when empty), publish timestamp, status,
/// ordered author names, ordered tier names and the body digest. Fields
/// that already match are left untouched.
pub fn reconcile(mut local: Metadata, remote: &Post, digest: &str) -> Reconciliation {
    let mut changed = Vec::new();

    if local.post_id.is_none() {
        if let Some(id) = &remote.id {
            local.post_id = Some(id.clone());
            changed.push(ChangedField::PostId);
        }
    }

    if local.published_at != remote.published_at {
        local.published_at = remote.published_at.clone();
        changed.push(ChangedField::PublishedAt);
    }

    if local.status != remote.status {
        local.status = remote.status;
        changed.push(ChangedField::Status);
    }

    let authors = remote.author_names();
    if local.authors != authors {
        local.authors = authors;
        changed.push(ChangedField::Authors);
    }

    let tiers = remote.tier_names();
    if local.tiers != tiers {
        local.tiers = tiers;
        changed.push(ChangedField::Tiers);
    }

    if local.hash.as_deref() != Some(digest) {
        local.hash = Some(digest.to_string());
        changed.push(ChangedField::Hash);
    }

    Reconciliation {
        metadata: local,
        changed,
    }
}
