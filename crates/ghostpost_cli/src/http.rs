//! Blocking `reqwest` implementation of [`HttpClient`].

use ghostpost_core::{HttpClient, HttpRequest, HttpResponse, Method, RequestBody};
use reqwest::blocking::{multipart, Client};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// HTTP client for the Ghost Admin API.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Creates a client whose requests fail after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ghostpost/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn build(&self, request: HttpRequest) -> Result<reqwest::blocking::RequestBuilder, String> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(bytes) => builder.body(bytes),
            RequestBody::Multipart(form) => {
                let part = multipart::Part::bytes(form.bytes)
                    .file_name(form.file_name)
                    .mime_str(&form.content_type)
                    .map_err(|e| e.to_string())?;
                let mut multipart = multipart::Form::new().part(form.field, part);
                for (name, value) in form.text_fields {
                    multipart = multipart.text(name, value);
                }
                builder.multipart(multipart)
            }
        };
        Ok(builder)
    }
}

impl HttpClient for ReqwestClient {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let response = self.build(request)?.send().map_err(|e| e.to_string())?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().map_err(|e| e.to_string())?.to_vec();

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}
