//! Create-or-update of the remote post.

use crate::error::{PublishError, PublishResult, ResponseBody, WriteKind};
use crate::model::Post;
use crate::transport::{GhostBackend, WriteResponse};
use tracing::info;

/// Result of an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    /// Id of the created or updated post.
    pub id: String,
    /// Which path was taken.
    pub kind: WriteKind,
}

/// Creates `post`, or updates `existing_id` with it.
///
/// An update first fetches the current post and forwards its
/// `updated_at` as the concurrency token; the backend rejects updates
/// without it. Tags and the feature image are left out of the update
/// payload. Nothing is retried.
pub fn upsert<B: GhostBackend>(
    backend: &B,
    post: Post,
    existing_id: Option<&str>,
) -> PublishResult<Upserted> {
    match existing_id.filter(|id| !id.is_empty()) {
        None => {
            let response = backend.create_post(&post)?;
            let id = single_id(WriteKind::Create, response)?;
            info!(post_id = %id, "created post");
            Ok(Upserted {
                id,
                kind: WriteKind::Create,
            })
        }
        Some(id) => {
            let current = backend.get_post(id)?;
            let post = post.into_update(id, current.updated_at);
            let response = backend.update_post(id, &post)?;
            let id = single_id(WriteKind::Update, response)?;
            info!(post_id = %id, "updated post");
            Ok(Upserted {
                id,
                kind: WriteKind::Update,
            })
        }
    }
}

fn single_id(operation: WriteKind, response: WriteResponse) -> PublishResult<String> {
    let empty = || PublishError::EmptyResult {
        operation,
        body: ResponseBody::from_bytes(&response.raw),
    };
    match response.posts.first() {
        Some(post) => post.id.clone().ok_or_else(empty),
        None => Err(empty()),
    }
}
