//! In-memory Ghost Admin API for tests.
//!
//! [`FakeGhost`] implements [`HttpClient`], so it sits underneath a real
//! [`GhostClient`](crate::GhostClient) and exercises the same request
//! building and response decoding as production. Clones share state.
//!
//! Behaviour follows the real backend where the engine depends on it:
//! ids and `updated_at` tokens are server-assigned, updates with a
//! missing or stale token fail with `UpdateCollisionError`, omitted
//! fields are left unchanged on update, and author/tier references are
//! expanded to full objects.

use crate::http::{HttpClient, HttpRequest, HttpResponse, Method, RequestBody};
use crate::model::{AuthorRef, Post, PostStatus, PostsEnvelope, TierRef};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// A request as seen by the fake.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    /// Method.
    pub method: Method,
    /// Path relative to the API root, including any query.
    pub path: String,
    /// Decoded post payload for create and update calls.
    pub post: Option<Post>,
    /// File name for image uploads.
    pub upload: Option<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    authors: Vec<AuthorRef>,
    tiers: Vec<TierRef>,
    posts: BTreeMap<String, Post>,
    next_id: u64,
    clock: u64,
    token: Option<String>,
    fail_authors: bool,
    fail_tiers: bool,
    reject_authors: bool,
    reject_tiers: bool,
    fail_fetches: bool,
    failing_uploads: HashSet<String>,
    uploads: Vec<String>,
    writes: usize,
    requests: Vec<Recorded>,
}

impl FakeState {
    fn tick(&mut self) -> String {
        self.clock += 1;
        format!(
            "2026-01-01T{:02}:{:02}:{:02}.000Z",
            (self.clock / 3600) % 24,
            (self.clock / 60) % 60,
            self.clock % 60
        )
    }

    fn expand_authors(&self, refs: &[AuthorRef]) -> Vec<AuthorRef> {
        refs.iter()
            .map(|r| {
                self.authors
                    .iter()
                    .find(|a| a.id == r.id)
                    .cloned()
                    .unwrap_or_else(|| AuthorRef {
                        id: r.id.clone(),
                        name: Some(r.id.clone()),
                    })
            })
            .collect()
    }

    fn expand_tiers(&self, refs: &[TierRef]) -> Vec<TierRef> {
        refs.iter()
            .map(|r| {
                self.tiers
                    .iter()
                    .find(|t| t.id == r.id)
                    .cloned()
                    .unwrap_or_else(|| r.clone())
            })
            .collect()
    }

    fn finalize(&mut self, post: &mut Post) {
        let status = *post.status.get_or_insert(PostStatus::Draft);
        if status == PostStatus::Published && post.published_at.is_none() {
            post.published_at = Some(self.tick());
        }
        post.updated_at = Some(self.tick());
    }
}

/// In-memory Ghost backend.
#[derive(Debug, Clone, Default)]
pub struct FakeGhost {
    state: Arc<Mutex<FakeState>>,
}

impl FakeGhost {
    /// API root the fake answers on.
    pub const API_URL: &'static str = "https://blog.example/ghost/api/admin/";

    /// Prefix of every uploaded image URL; the file name follows.
    pub const IMAGE_URL_PREFIX: &'static str = "https://blog.example/content/images/";

    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a staff user.
    pub fn with_author(self, id: &str, name: &str) -> Self {
        self.state.lock().authors.push(AuthorRef {
            id: id.into(),
            name: Some(name.into()),
        });
        self
    }

    /// Adds a membership tier.
    pub fn with_tier(self, id: &str, name: &str, slug: &str) -> Self {
        self.state.lock().tiers.push(TierRef {
            id: id.into(),
            name: Some(name.into()),
            slug: Some(slug.into()),
        });
        self
    }

    /// Rejects requests that do not carry `Ghost <token>`.
    pub fn require_token(&self, token: &str) {
        self.state.lock().token = Some(token.to_string());
    }

    /// Makes the author listing answer with a non-JSON 500.
    pub fn fail_author_listing(&self) {
        self.state.lock().fail_authors = true;
    }

    /// Makes the tier listing answer with a non-JSON 503.
    pub fn fail_tier_listing(&self) {
        self.state.lock().fail_tiers = true;
    }

    /// Makes the author listing answer with a JSON 500 error payload.
    pub fn reject_author_listing(&self) {
        self.state.lock().reject_authors = true;
    }

    /// Makes the tier listing answer with a JSON 500 error payload.
    pub fn reject_tier_listing(&self) {
        self.state.lock().reject_tiers = true;
    }

    /// Makes every post fetch fail at the transport level.
    pub fn fail_fetches(&self) {
        self.state.lock().fail_fetches = true;
    }

    /// Makes uploads of `file_name` fail.
    pub fn fail_upload(&self, file_name: &str) {
        self.state.lock().failing_uploads.insert(file_name.to_string());
    }

    /// Returns a stored post.
    pub fn post(&self, id: &str) -> Option<Post> {
        self.state.lock().posts.get(id).cloned()
    }

    /// Number of stored posts.
    pub fn post_count(&self) -> usize {
        self.state.lock().posts.len()
    }

    /// Edits a stored post as if through the admin UI.
    ///
    /// Bumps `updated_at`, invalidating earlier concurrency tokens.
    pub fn edit_post(&self, id: &str, edit: impl FnOnce(&mut Post)) -> bool {
        let mut state = self.state.lock();
        let Some(mut post) = state.posts.get(id).cloned() else {
            return false;
        };
        edit(&mut post);
        state.finalize(&mut post);
        state.posts.insert(id.to_string(), post);
        true
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().requests.clone()
    }

    /// Forgets recorded requests.
    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    /// Number of successful image uploads.
    pub fn upload_count(&self) -> usize {
        self.state.lock().uploads.len()
    }

    /// Number of successful post creates and updates.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    /// Number of successful remote mutations of any kind.
    pub fn mutation_count(&self) -> usize {
        let state = self.state.lock();
        state.writes + state.uploads.len()
    }

    fn handle(&self, request: &HttpRequest, path: &str) -> Result<HttpResponse, String> {
        let route = path.split('?').next().unwrap_or_default();
        let segments: Vec<&str> = route.trim_end_matches('/').split('/').collect();
        let mut state = self.state.lock();

        if let Some(token) = &state.token {
            if request.header("Authorization") != Some(format!("Ghost {token}").as_str()) {
                return Ok(error(401, "UnauthorizedError", "Authorization failed"));
            }
        }

        match (request.method, segments.as_slice()) {
            (Method::Get, ["authors"]) => {
                if state.fail_authors {
                    return Ok(HttpResponse {
                        status: 500,
                        content_type: Some("text/html".into()),
                        body: b"<html>Internal Server Error</html>".to_vec(),
                    });
                }
                if state.reject_authors {
                    return Ok(error(500, "InternalServerError", "Unable to list users."));
                }
                Ok(ok(200, json!({ "authors": state.authors })))
            }
            (Method::Get, ["tiers"]) => {
                if state.fail_tiers {
                    return Ok(HttpResponse::text(503, "Service Unavailable"));
                }
                if state.reject_tiers {
                    return Ok(error(500, "InternalServerError", "Unable to list tiers."));
                }
                Ok(ok(200, json!({ "tiers": state.tiers })))
            }
            (Method::Get, ["posts", id]) => {
                if state.fail_fetches {
                    return Err("operation timed out".into());
                }
                match state.posts.get(*id) {
                    Some(post) => Ok(ok(200, json!({ "posts": [post] }))),
                    None => Ok(error(404, "NotFoundError", "Post not found.")),
                }
            }
            (Method::Post, ["posts"]) => {
                let Some(mut post) = decode_post(&request.body) else {
                    return Ok(error(400, "BadRequestError", "No posts found in body"));
                };
                state.next_id += 1;
                let id = format!("{:024x}", state.next_id);
                post.id = Some(id.clone());
                if post.authors.is_empty() {
                    post.authors = state.authors.iter().take(1).cloned().collect();
                }
                post.authors = state.expand_authors(&post.authors);
                post.tiers = state.expand_tiers(&post.tiers);
                state.finalize(&mut post);
                state.posts.insert(id, post.clone());
                state.writes += 1;
                Ok(ok(201, json!({ "posts": [post] })))
            }
            (Method::Put, ["posts", id]) => {
                let Some(sent) = decode_post(&request.body) else {
                    return Ok(error(400, "BadRequestError", "No posts found in body"));
                };
                let Some(mut stored) = state.posts.get(*id).cloned() else {
                    return Ok(error(404, "NotFoundError", "Post not found."));
                };
                if sent.updated_at.is_none() || sent.updated_at != stored.updated_at {
                    return Ok(error(
                        409,
                        "UpdateCollisionError",
                        "Saving failed! Someone else is editing this post.",
                    ));
                }

                stored.title = sent.title;
                merge(&mut stored.slug, sent.slug);
                merge(&mut stored.status, sent.status);
                merge(&mut stored.html, sent.html);
                merge(&mut stored.feature_image, sent.feature_image);
                merge(&mut stored.custom_excerpt, sent.custom_excerpt);
                merge(&mut stored.published_at, sent.published_at);
                merge(&mut stored.visibility, sent.visibility);
                merge(&mut stored.custom_template, sent.custom_template);
                stored.featured = sent.featured;
                if !sent.tags.is_empty() {
                    stored.tags = sent.tags;
                }
                if !sent.authors.is_empty() {
                    stored.authors = state.expand_authors(&sent.authors);
                }
                if !sent.tiers.is_empty() {
                    stored.tiers = state.expand_tiers(&sent.tiers);
                }
                state.finalize(&mut stored);
                state.posts.insert(id.to_string(), stored.clone());
                state.writes += 1;
                Ok(ok(200, json!({ "posts": [stored] })))
            }
            (Method::Post, ["images", "upload"]) => {
                let RequestBody::Multipart(form) = &request.body else {
                    return Ok(error(400, "BadRequestError", "Expected multipart body"));
                };
                if state.failing_uploads.contains(&form.file_name) {
                    return Ok(error(415, "UnsupportedMediaTypeError", "Please select a valid image."));
                }
                state.uploads.push(form.file_name.clone());
                let url = format!("{}{}", Self::IMAGE_URL_PREFIX, form.file_name);
                Ok(ok(201, json!({ "images": [{ "url": url, "ref": form.file_name }] })))
            }
            _ => Ok(HttpResponse::text(404, "Not Found")),
        }
    }
}

impl HttpClient for FakeGhost {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let path = request
            .url
            .strip_prefix(Self::API_URL)
            .ok_or_else(|| format!("unknown host for {}", request.url))?
            .to_string();

        let upload = match &request.body {
            RequestBody::Multipart(form) => Some(form.file_name.clone()),
            _ => None,
        };
        self.state.lock().requests.push(Recorded {
            method: request.method,
            path: path.clone(),
            post: decode_post(&request.body),
            upload,
        });

        self.handle(&request, &path)
    }
}

fn merge<T>(stored: &mut Option<T>, sent: Option<T>) {
    if sent.is_some() {
        *stored = sent;
    }
}

fn decode_post(body: &RequestBody) -> Option<Post> {
    match body {
        RequestBody::Json(bytes) => serde_json::from_slice::<PostsEnvelope>(bytes)
            .ok()
            .and_then(|envelope| envelope.posts.into_iter().next()),
        _ => None,
    }
}

fn ok(status: u16, value: serde_json::Value) -> HttpResponse {
    HttpResponse::json(status, value.to_string())
}

fn error(status: u16, kind: &str, message: &str) -> HttpResponse {
    ok(
        status,
        json!({ "errors": [{ "type": kind, "message": message }] }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PublishError;
    use crate::transport::{GhostBackend, GhostClient};

    #[test]
    fn clones_share_state() {
        let ghost = FakeGhost::new().with_author("a1", "Ada");
        let client = GhostClient::new(FakeGhost::API_URL, "tok", ghost.clone());

        let authors = client.list_authors().unwrap();
        assert_eq!(authors.len(), 1);
        assert_eq!(ghost.requests().len(), 1);
    }

    #[test]
    fn wrong_token_is_unauthorized() {
        let ghost = FakeGhost::new();
        ghost.require_token("right");
        let client = GhostClient::new(FakeGhost::API_URL, "wrong", ghost.clone());

        let err = client.list_tiers().unwrap_err();
        match err {
            PublishError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.to_string().contains("UnauthorizedError"));
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(client.get_post("p1").is_err());
    }

    #[test]
    fn out_of_band_edit_invalidates_token() {
        let ghost = FakeGhost::new();
        let client = GhostClient::new(FakeGhost::API_URL, "tok", ghost.clone());
        let created = client
            .create_post(&Post {
                title: "T".into(),
                ..Post::default()
            })
            .unwrap();
        let post = created.posts[0].clone();
        let id = post.id.clone().unwrap();

        assert!(ghost.edit_post(&id, |p| p.title = "Edited".into()));
        let response = client.update_post(&id, &post).unwrap();
        assert!(response.posts.is_empty());
        assert_eq!(ghost.post(&id).unwrap().title, "Edited");
    }

    #[test]
    fn publishing_assigns_a_timestamp() {
        let ghost = FakeGhost::new();
        let client = GhostClient::new(FakeGhost::API_URL, "tok", ghost.clone());
        let created = client
            .create_post(&Post {
                title: "T".into(),
                status: Some(PostStatus::Published),
                ..Post::default()
            })
            .unwrap();

        let post = &created.posts[0];
        assert!(post.published_at.is_some());
        assert!(post.updated_at.is_some());
        assert_ne!(post.published_at, post.updated_at);
    }
}
