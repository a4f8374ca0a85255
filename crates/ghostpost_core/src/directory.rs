//! Resolution of author and tier names to backend references.
//!
//! Both directories are listed once per publish. When the backend holds
//! duplicate names or slugs, the first entry in listing order wins.

use crate::error::{PublishError, PublishResult};
use crate::model::{AuthorRef, TierRef};
use crate::transport::GhostBackend;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Authors indexed by name.
#[derive(Debug, Clone, Default)]
pub struct AuthorIndex {
    by_name: HashMap<String, AuthorRef>,
}

impl AuthorIndex {
    /// Builds the index from a full listing.
    pub fn new(authors: Vec<AuthorRef>) -> Self {
        let mut by_name = HashMap::with_capacity(authors.len());
        for author in authors {
            if let Some(name) = author.name.clone() {
                by_name.entry(name).or_insert(author);
            }
        }
        Self { by_name }
    }

    /// Looks up an author by exact name.
    pub fn get(&self, name: &str) -> Option<&AuthorRef> {
        self.by_name.get(name)
    }
}

/// Tiers indexed by name and by slug.
#[derive(Debug, Clone, Default)]
pub struct TierIndex {
    by_name: HashMap<String, TierRef>,
    by_slug: HashMap<String, TierRef>,
    names: Vec<String>,
}

impl TierIndex {
    /// Builds the index from a full listing.
    pub fn new(tiers: Vec<TierRef>) -> Self {
        let mut index = Self::default();
        for tier in tiers {
            if let Some(name) = tier.name.clone() {
                if !index.by_name.contains_key(&name) {
                    index.names.push(name.clone());
                    index.by_name.insert(name, tier.clone());
                }
            }
            if let Some(slug) = tier.slug.clone() {
                index.by_slug.entry(slug).or_insert(tier);
            }
        }
        index
    }

    /// Looks up a tier by name, then by slug.
    pub fn get(&self, name_or_slug: &str) -> Option<&TierRef> {
        self.by_name
            .get(name_or_slug)
            .or_else(|| self.by_slug.get(name_or_slug))
    }

    /// Known tier names in listing order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Directory lookups for one publish.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    /// `None` when the author listing failed.
    authors: Option<AuthorIndex>,
    tiers: TierIndex,
}

impl DirectoryResolver {
    /// Lists both directories from the backend.
    ///
    /// A failed author listing degrades to passing names through; a
    /// failed tier listing is fatal.
    pub fn load<B: GhostBackend>(backend: &B) -> PublishResult<Self> {
        let authors = match backend.list_authors() {
            Ok(authors) => {
                debug!(count = authors.len(), "listed authors");
                Some(AuthorIndex::new(authors))
            }
            Err(e) if e.is_degradable() => {
                warn!(error = %e, "could not fetch authors, using names as ids");
                None
            }
            Err(e) => return Err(e),
        };

        let tiers = backend
            .list_tiers()
            .map_err(|e| PublishError::TierListing(Box::new(e)))?;
        debug!(count = tiers.len(), "listed tiers");

        Ok(Self::new(authors, TierIndex::new(tiers)))
    }

    /// Creates a resolver from prebuilt indexes.
    pub fn new(authors: Option<AuthorIndex>, tiers: TierIndex) -> Self {
        Self { authors, tiers }
    }

    /// Returns true if author lookups are degraded to pass-through.
    pub fn is_degraded(&self) -> bool {
        self.authors.is_none()
    }

    /// Resolves author names, best effort.
    ///
    /// Unknown names are dropped. In degraded mode each name is passed
    /// through unchanged as an id.
    pub fn resolve_authors(&self, names: &[String]) -> Vec<AuthorRef> {
        let Some(index) = &self.authors else {
            return names.iter().map(AuthorRef::by_id).collect();
        };

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            match index.get(name) {
                Some(author) if seen.insert(author.id.clone()) => resolved.push(author.clone()),
                Some(_) => {}
                None => debug!(author = %name, "no such author, dropping"),
            }
        }
        resolved
    }

    /// Resolves tier names or slugs, strictly.
    ///
    /// Fails on the first value that matches neither a tier name nor a
    /// slug. Repeats of the same tier collapse to one reference.
    pub fn resolve_tiers(&self, names: &[String]) -> PublishResult<Vec<TierRef>> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            let tier = self
                .tiers
                .get(name)
                .ok_or_else(|| PublishError::UnknownTier {
                    tier: name.clone(),
                    known: self.tiers.names().to_vec(),
                })?;
            if seen.insert(tier.id.clone()) {
                resolved.push(tier.clone());
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeGhost;
    use crate::transport::GhostClient;

    fn tier(id: &str, name: &str, slug: &str) -> TierRef {
        TierRef {
            id: id.into(),
            name: Some(name.into()),
            slug: Some(slug.into()),
        }
    }

    fn author(id: &str, name: &str) -> AuthorRef {
        AuthorRef {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn tiers_match_by_name_or_slug_and_dedupe() {
        let index = TierIndex::new(vec![tier("t1", "Gold", "gold"), tier("t2", "Free", "free")]);
        let resolver = DirectoryResolver::new(Some(AuthorIndex::default()), index);

        let tiers = resolver
            .resolve_tiers(&names(&["Gold", "free", "gold"]))
            .unwrap();
        let ids: Vec<_> = tiers.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
    }

    #[test]
    fn unknown_tier_lists_known_names() {
        let index = TierIndex::new(vec![tier("t1", "Gold", "gold")]);
        let resolver = DirectoryResolver::new(None, index);

        let err = resolver
            .resolve_tiers(&names(&["Gold", "unknown-x"]))
            .unwrap_err();
        match err {
            PublishError::UnknownTier { tier, known } => {
                assert_eq!(tier, "unknown-x");
                assert_eq!(known, vec!["Gold"]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn first_duplicate_wins() {
        let index = TierIndex::new(vec![tier("t1", "Gold", "gold"), tier("t9", "Gold", "gold-2")]);
        assert_eq!(index.get("Gold").unwrap().id, "t1");
        assert_eq!(index.get("gold-2").unwrap().id, "t9");
        assert_eq!(index.names(), ["Gold"]);

        let authors = AuthorIndex::new(vec![author("a1", "Sam"), author("a2", "Sam")]);
        assert_eq!(authors.get("Sam").unwrap().id, "a1");
    }

    #[test]
    fn unknown_authors_are_dropped() {
        let authors = AuthorIndex::new(vec![author("a1", "Ada"), author("a2", "Grace")]);
        let resolver = DirectoryResolver::new(Some(authors), TierIndex::default());

        let resolved = resolver.resolve_authors(&names(&["Grace", "Nobody", "Ada", "Grace"]));
        let ids: Vec<_> = resolved.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a2", "a1"]);
    }

    #[test]
    fn failed_author_listing_passes_names_through() {
        let ghost = FakeGhost::new();
        ghost.fail_author_listing();
        let client = GhostClient::new(FakeGhost::API_URL, "tok", ghost.clone());

        let resolver = DirectoryResolver::load(&client).unwrap();
        assert!(resolver.is_degraded());

        let resolved = resolver.resolve_authors(&names(&["Ada Lovelace"]));
        assert_eq!(resolved, vec![AuthorRef::by_id("Ada Lovelace")]);
    }

    #[test]
    fn json_error_on_author_listing_passes_names_through() {
        let ghost = FakeGhost::new().with_author("a1", "Ada Lovelace");
        ghost.reject_author_listing();
        let client = GhostClient::new(FakeGhost::API_URL, "tok", ghost.clone());

        let resolver = DirectoryResolver::load(&client).unwrap();
        assert!(resolver.is_degraded());
        let resolved = resolver.resolve_authors(&names(&["Ada Lovelace"]));
        assert_eq!(resolved, vec![AuthorRef::by_id("Ada Lovelace")]);
    }

    #[test]
    fn json_error_on_tier_listing_is_fatal() {
        let ghost = FakeGhost::new().with_tier("t1", "Gold", "gold");
        ghost.reject_tier_listing();
        let client = GhostClient::new(FakeGhost::API_URL, "tok", ghost.clone());

        let err = DirectoryResolver::load(&client).unwrap_err();
        match err {
            PublishError::TierListing(source) => {
                assert!(matches!(*source, PublishError::Status { status: 500, .. }));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn failed_tier_listing_is_fatal() {
        let ghost = FakeGhost::new();
        ghost.fail_tier_listing();
        let client = GhostClient::new(FakeGhost::API_URL, "tok", ghost.clone());

        let err = DirectoryResolver::load(&client).unwrap_err();
        assert!(matches!(err, PublishError::TierListing(_)));
    }
}
