//! Publish command implementation.

use crate::browser;
use crate::config::Settings;
use crate::http::ReqwestClient;
use ghostpost_core::{
    GhostClient, MarkdownRenderer, PublishOutcome, PublishReport, Publisher, WriteKind,
};
use std::path::Path;
use tracing::warn;

/// Runs the publish command.
pub fn run(
    settings: &Settings,
    file: &Path,
    open_editor: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = settings.publish_config();
    let client = ReqwestClient::new(config.timeout)?;
    let backend = GhostClient::new(&settings.api_url, &settings.token, client);
    let publisher = Publisher::new(config, backend, MarkdownRenderer::new());

    let outcome = publisher.publish(file)?;
    match &outcome {
        PublishOutcome::Skipped { .. } => {
            println!("↻ no changes since last publish, skipping…");
        }
        PublishOutcome::Published(report) => print_report(file, report),
    }

    if open_editor {
        let url = publisher.config().editor_url(outcome.post_id());
        println!("Opening {url}");
        if let Err(e) = browser::open(&url) {
            warn!(error = %e, %url, "could not launch browser");
        }
    }

    Ok(())
}

fn print_report(file: &Path, report: &PublishReport) {
    let verb = match report.kind {
        WriteKind::Create => "Created",
        WriteKind::Update => "Updated",
    };
    println!("✓ {verb} post {}", report.post_id);

    let media = report.media;
    if media.uploaded + media.reused + media.failed > 0 {
        println!(
            "  Images: {} uploaded, {} reused, {} failed",
            media.uploaded, media.reused, media.failed
        );
    }

    if report.written_back {
        let fields: Vec<String> = report.changed.iter().map(ToString::to_string).collect();
        println!("  Updated {}: {}", file.display(), fields.join(", "));
    }
    println!("  Took {:.2?}", report.duration);
}
