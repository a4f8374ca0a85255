//! Ghost Admin API transport.

use crate::error::{PublishError, PublishResult, ResponseBody};
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method, MultipartForm, RequestBody};
use crate::model::{
    AuthorRef, AuthorsEnvelope, ImagesEnvelope, Post, PostsEnvelope, TierRef, TiersEnvelope,
};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Admin API major version sent with every request.
pub const ACCEPT_VERSION: &str = "v5.0";

/// Outcome of a create or update call.
///
/// The raw body is kept so an empty result can be reported with
/// whatever the server sent instead.
#[derive(Debug, Clone, Default)]
pub struct WriteResponse {
    /// Posts in the response; exactly one on success.
    pub posts: Vec<Post>,
    /// Raw response body.
    pub raw: Vec<u8>,
}

/// The remote operations the publish engine needs.
///
/// This trait abstracts the backend, allowing the real HTTP client and
/// in-memory doubles to be swapped.
pub trait GhostBackend {
    /// Lists every staff user.
    fn list_authors(&self) -> PublishResult<Vec<AuthorRef>>;

    /// Lists every membership tier.
    fn list_tiers(&self) -> PublishResult<Vec<TierRef>>;

    /// Fetches a post by id.
    fn get_post(&self, id: &str) -> PublishResult<Post>;

    /// Creates a post from HTML.
    fn create_post(&self, post: &Post) -> PublishResult<WriteResponse>;

    /// Updates a post from HTML. `post.updated_at` must carry the
    /// concurrency token of the current remote version.
    fn update_post(&self, id: &str, post: &Post) -> PublishResult<WriteResponse>;

    /// Uploads an image and returns its public URL.
    fn upload_image(&self, bytes: &[u8], file_name: &str) -> PublishResult<String>;
}

impl<B: GhostBackend + ?Sized> GhostBackend for &B {
    fn list_authors(&self) -> PublishResult<Vec<AuthorRef>> {
        (**self).list_authors()
    }

    fn list_tiers(&self) -> PublishResult<Vec<TierRef>> {
        (**self).list_tiers()
    }

    fn get_post(&self, id: &str) -> PublishResult<Post> {
        (**self).get_post(id)
    }

    fn create_post(&self, post: &Post) -> PublishResult<WriteResponse> {
        (**self).create_post(post)
    }

    fn update_post(&self, id: &str, post: &Post) -> PublishResult<WriteResponse> {
        (**self).update_post(id, post)
    }

    fn upload_image(&self, bytes: &[u8], file_name: &str) -> PublishResult<String> {
        (**self).upload_image(bytes, file_name)
    }
}

/// Ghost Admin API client over an injected [`HttpClient`].
pub struct GhostClient<C: HttpClient> {
    /// Admin API root, ending in `/`.
    base_url: String,
    /// Opaque bearer token.
    token: String,
    /// HTTP client implementation.
    client: C,
}

impl<C: HttpClient> GhostClient<C> {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, client: C) -> Self {
        Self {
            base_url: crate::config::normalize_api_url(&base_url.into()),
            token: token.into(),
            client,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the underlying HTTP client.
    pub fn http(&self) -> &C {
        &self.client
    }

    fn request(&self, method: Method, path: &str) -> HttpRequest {
        HttpRequest::new(method, format!("{}{}", self.base_url, path))
            .with_header("Authorization", format!("Ghost {}", self.token))
            .with_header("Accept-Version", ACCEPT_VERSION)
    }

    fn send(&self, request: HttpRequest) -> PublishResult<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.client.send(request).map_err(PublishError::Transport)?;
        debug!(status = response.status, bytes = response.body.len(), "received response");
        Ok(response)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> PublishResult<T> {
        let response = self.send(self.request(Method::Get, path))?;
        if !response.is_json() {
            return Err(PublishError::Api(response.text_body()));
        }
        if !response.is_success() {
            return Err(PublishError::Status {
                status: response.status,
                body: ResponseBody::from_bytes(&response.body),
            });
        }
        decode(path, &response.body)
    }

    fn write_json(&self, method: Method, path: &str, post: &Post) -> PublishResult<WriteResponse> {
        let envelope = PostsEnvelope {
            posts: vec![post.clone()],
        };
        let body = serde_json::to_vec(&envelope)
            .map_err(|e| PublishError::Protocol(format!("failed to encode post: {e}")))?;

        let request = self
            .request(method, path)
            .with_header("Content-Type", "application/json")
            .with_body(RequestBody::Json(body));
        let response = self.send(request)?;
        if !response.is_json() {
            return Err(PublishError::Api(response.text_body()));
        }

        // Error payloads carry no posts; the caller reports them from `raw`.
        let decoded: PostsEnvelope = if response.is_success() {
            decode(path, &response.body)?
        } else {
            PostsEnvelope::default()
        };
        Ok(WriteResponse {
            posts: decoded.posts,
            raw: response.body,
        })
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: &[u8]) -> PublishResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        PublishError::Protocol(format!(
            "failed to decode {path}: {e} ({})",
            ResponseBody::from_bytes(body)
        ))
    })
}

impl<C: HttpClient> GhostBackend for GhostClient<C> {
    fn list_authors(&self) -> PublishResult<Vec<AuthorRef>> {
        let envelope: AuthorsEnvelope = self.get_json("authors/?limit=all")?;
        Ok(envelope.authors)
    }

    fn list_tiers(&self) -> PublishResult<Vec<TierRef>> {
        let envelope: TiersEnvelope = self.get_json("tiers/?limit=all")?;
        Ok(envelope.tiers)
    }

    fn get_post(&self, id: &str) -> PublishResult<Post> {
        let envelope = match self.get_json::<PostsEnvelope>(&format!("posts/{id}/")) {
            Err(PublishError::Status { status: 404, .. }) => {
                return Err(PublishError::PostNotFound(id.to_string()));
            }
            other => other?,
        };
        envelope
            .posts
            .into_iter()
            .next()
            .ok_or_else(|| PublishError::PostNotFound(id.to_string()))
    }

    fn create_post(&self, post: &Post) -> PublishResult<WriteResponse> {
        self.write_json(Method::Post, "posts/?source=html", post)
    }

    fn update_post(&self, id: &str, post: &Post) -> PublishResult<WriteResponse> {
        self.write_json(Method::Put, &format!("posts/{id}/?source=html"), post)
    }

    fn upload_image(&self, bytes: &[u8], file_name: &str) -> PublishResult<String> {
        let form = MultipartForm {
            field: "file".into(),
            file_name: file_name.to_string(),
            content_type: mime_guess::from_path(file_name)
                .first_or_octet_stream()
                .to_string(),
            bytes: bytes.to_vec(),
            text_fields: vec![("ref".into(), file_name.to_string())],
        };
        let request = self
            .request(Method::Post, "images/upload/")
            .with_body(RequestBody::Multipart(form));

        let response = self.send(request)?;
        if response.status >= 300 {
            return Err(PublishError::Upload(format!(
                "status code {}: {}",
                response.status,
                response.text_body()
            )));
        }
        if !response.is_json() {
            return Err(PublishError::Api(response.text_body()));
        }

        let envelope: ImagesEnvelope = serde_json::from_slice(&response.body)
            .map_err(|e| PublishError::Protocol(format!("failed to decode upload reply: {e}")))?;
        envelope
            .images
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or_else(|| PublishError::Upload("no image returned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    struct TestClient {
        responses: Mutex<VecDeque<Result<HttpResponse, String>>>,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl TestClient {
        fn new() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn push(&self, response: Result<HttpResponse, String>) {
            self.responses.lock().push_back(response);
        }

        fn sent(&self) -> Vec<HttpRequest> {
            self.sent.lock().clone()
        }
    }

    impl HttpClient for TestClient {
        fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
            self.sent.lock().push(request);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err("No response set".into()))
        }
    }

    fn client() -> GhostClient<TestClient> {
        GhostClient::new("https://blog.example/ghost/api/admin", "tok", TestClient::new())
    }

    #[test]
    fn requests_carry_token_and_version() {
        let ghost = client();
        ghost.http().push(Ok(HttpResponse::json(
            200,
            r#"{"tiers":[{"id":"t1","name":"Gold","slug":"gold"}]}"#,
        )));

        let tiers = ghost.list_tiers().unwrap();
        assert_eq!(tiers.len(), 1);

        let sent = ghost.http().sent();
        assert_eq!(sent[0].url, "https://blog.example/ghost/api/admin/tiers/?limit=all");
        assert_eq!(sent[0].header("Authorization"), Some("Ghost tok"));
        assert_eq!(sent[0].header("Accept-Version"), Some(ACCEPT_VERSION));
    }

    #[test]
    fn non_json_reply_is_an_api_error() {
        let ghost = client();
        ghost
            .http()
            .push(Ok(HttpResponse::text(502, "<html>Bad Gateway</html>\n")));

        let err = ghost.list_authors().unwrap_err();
        assert!(matches!(err, PublishError::Api(ref body) if body == "<html>Bad Gateway</html>"));
    }

    #[test]
    fn transport_failure_is_reported() {
        let ghost = client();
        ghost.http().push(Err("connection refused".into()));

        let err = ghost.get_post("p1").unwrap_err();
        assert!(matches!(err, PublishError::Transport(ref m) if m == "connection refused"));
    }

    #[test]
    fn missing_post_is_not_found() {
        let ghost = client();
        ghost.http().push(Ok(HttpResponse::json(
            404,
            r#"{"errors":[{"message":"Post not found."}]}"#,
        )));

        let err = ghost.get_post("p404").unwrap_err();
        assert!(matches!(err, PublishError::PostNotFound(ref id) if id == "p404"));
    }

    #[test]
    fn json_error_status_is_not_an_empty_listing() {
        let ghost = client();
        let raw = r#"{"errors":[{"type":"InternalServerError","message":"boom"}]}"#;
        ghost.http().push(Ok(HttpResponse::json(500, raw)));
        ghost.http().push(Ok(HttpResponse::json(403, raw)));

        let err = ghost.list_authors().unwrap_err();
        match err {
            PublishError::Status { status, body } => {
                assert_eq!(status, 500);
                assert!(body.to_string().contains("InternalServerError"));
            }
            other => panic!("unexpected error {other}"),
        }

        let err = ghost.list_tiers().unwrap_err();
        assert!(matches!(err, PublishError::Status { status: 403, .. }));
    }

    #[test]
    fn server_error_on_fetch_is_not_not_found() {
        let ghost = client();
        ghost.http().push(Ok(HttpResponse::json(
            500,
            r#"{"errors":[{"message":"boom"}]}"#,
        )));

        let err = ghost.get_post("p1").unwrap_err();
        assert!(matches!(err, PublishError::Status { status: 500, .. }));
    }

    #[test]
    fn undecodable_write_success_is_a_protocol_error() {
        let ghost = client();
        ghost
            .http()
            .push(Ok(HttpResponse::json(200, r#"{"posts":"not a list"}"#)));

        let post = Post {
            title: "T".into(),
            ..Post::default()
        };
        let err = ghost.update_post("p1", &post).unwrap_err();
        match err {
            PublishError::Protocol(message) => {
                assert!(message.starts_with("failed to decode posts/p1/?source=html"));
                assert!(message.contains("not a list"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn write_keeps_raw_body_of_error_payloads() {
        let ghost = client();
        let raw = r#"{"errors":[{"type":"ValidationError"}]}"#;
        ghost.http().push(Ok(HttpResponse::json(422, raw)));

        let post = Post {
            title: "T".into(),
            ..Post::default()
        };
        let response = ghost.create_post(&post).unwrap();
        assert!(response.posts.is_empty());
        assert_eq!(response.raw, raw.as_bytes());

        let sent = ghost.http().sent();
        assert_eq!(sent[0].method, Method::Post);
        assert!(sent[0].url.ends_with("posts/?source=html"));
        match &sent[0].body {
            RequestBody::Json(bytes) => {
                let json: serde_json::Value = serde_json::from_slice(bytes).unwrap();
                assert_eq!(json["posts"][0]["title"], "T");
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn upload_sends_multipart_with_guessed_type() {
        let ghost = client();
        ghost.http().push(Ok(HttpResponse::json(
            201,
            r#"{"images":[{"url":"https://blog.example/content/images/cat.png","ref":"cat.png"}]}"#,
        )));

        let url = ghost.upload_image(b"\x89PNG", "cat.png").unwrap();
        assert_eq!(url, "https://blog.example/content/images/cat.png");

        let sent = ghost.http().sent();
        match &sent[0].body {
            RequestBody::Multipart(form) => {
                assert_eq!(form.field, "file");
                assert_eq!(form.content_type, "image/png");
                assert_eq!(
                    form.text_fields,
                    vec![("ref".to_string(), "cat.png".to_string())]
                );
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn upload_rejected_by_status() {
        let ghost = client();
        ghost
            .http()
            .push(Ok(HttpResponse::json(413, r#"{"errors":[]}"#)));

        let err = ghost.upload_image(b"x", "huge.jpg").unwrap_err();
        assert!(matches!(err, PublishError::Upload(ref m) if m.starts_with("status code 413")));
    }
}
