//! Worker output protocol.
//!
//! The worker writes one record per line to stdout:
//!
//! ```text
//! STATUS::<free text>
//! SCREENSHOT::<path to an image file>
//! ```
//!
//! This is the only place those prefixes are interpreted. Any other line is
//! ignored.

use std::path::{Path, PathBuf};

use base64::Engine;
use tracing::{debug, warn};

use crate::error::ArtifactError;

const STATUS_PREFIX: &str = "STATUS::";
const SCREENSHOT_PREFIX: &str = "SCREENSHOT::";

/// A unit of worker progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomationEvent {
    Status(String),
    Image { bytes: Vec<u8>, mime: &'static str },
}

impl AutomationEvent {
    /// Self-describing `data:` URI for image events.
    pub fn data_uri(&self) -> Option<String> {
        match self {
            Self::Image { bytes, mime } => Some(format!(
                "data:{mime};base64,{}",
                base64::prelude::BASE64_STANDARD.encode(bytes)
            )),
            Self::Status(_) => None,
        }
    }
}

/// A recognized line, before any file access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Status(String),
    Screenshot(PathBuf),
}

/// Classify a single output line. Unrecognized lines yield `None`.
pub fn parse_line(line: &str) -> Option<OutputLine> {
    let line = line.trim_end_matches('\r');
    if let Some(text) = line.strip_prefix(STATUS_PREFIX) {
        return Some(OutputLine::Status(text.trim().to_string()));
    }
    if let Some(path) = line.strip_prefix(SCREENSHOT_PREFIX) {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        return Some(OutputLine::Screenshot(PathBuf::from(path)));
    }
    None
}

/// MIME type guessed from the screenshot's extension. JPEG when unknown.
fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// Read a screenshot and delete it.
async fn take_screenshot(path: &Path) -> Result<AutomationEvent, ArtifactError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            ArtifactError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "Failed to delete screenshot");
    }

    Ok(AutomationEvent::Image {
        bytes,
        mime: mime_for(path),
    })
}

/// Parse the worker's full captured stdout into events, in emission order.
///
/// Screenshot files are consumed: read, then removed. A screenshot that
/// cannot be read is logged and dropped.
pub async fn parse_output(output: &str) -> Vec<AutomationEvent> {
    let mut events = Vec::new();
    for line in output.lines() {
        match parse_line(line) {
            Some(OutputLine::Status(text)) => events.push(AutomationEvent::Status(text)),
            Some(OutputLine::Screenshot(path)) => match take_screenshot(&path).await {
                Ok(event) => events.push(event),
                Err(e) => warn!(error = %e, "Dropping screenshot event"),
            },
            None => {
                if !line.trim().is_empty() {
                    debug!(line, "Ignoring unrecognized worker output");
                }
            }
        }
    }
    events
}
