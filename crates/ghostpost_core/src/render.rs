//! Markdown to HTML rendering.

use crate::error::PublishResult;
use pulldown_cmark::{html, Options, Parser};

/// Converts a Markdown body into the HTML sent to the backend.
pub trait Renderer {
    /// Renders `markdown` to HTML.
    fn render(&self, markdown: &str) -> PublishResult<String>;
}

/// Plain CommonMark renderer.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownRenderer {
    options: Options,
}

impl MarkdownRenderer {
    /// Creates a renderer with no extensions enabled.
    pub fn new() -> Self {
        Self {
            options: Options::empty(),
        }
    }

    /// Enables additional pulldown-cmark extensions.
    pub fn with_options(mut self, options: Options) -> Self {
        self.options.insert(options);
        self
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, markdown: &str) -> PublishResult<String> {
        let parser = Parser::new_ext(markdown, self.options);
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        Ok(out)
    }
}
