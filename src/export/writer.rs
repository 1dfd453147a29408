//! Persist one message as a directory with body, metadata, and attachments.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{GraphError, Result};
use crate::model::message::Message;

use super::attachment::{save_attachments, AttachmentSource};
use super::paths::{item_dir_name, unique_path};

/// What one successful export produced.
#[derive(Debug, Clone)]
pub struct ItemRecord {
    /// Directory the message landed in.
    pub dir: PathBuf,
    /// Total bytes written (body + metadata + attachments).
    pub bytes_written: u64,
    /// Number of attachment files saved.
    pub attachments_saved: usize,
}

/// Sidecar written next to the body file.
#[derive(Debug, Serialize)]
struct Metadata<'a> {
    subject: Option<&'a str>,
    sender: &'a str,
    received_time: String,
    has_attachments: bool,
    body_type: &'static str,
}

/// Writes messages under a fixed output root. Holds no per-item state;
/// each [`ItemWriter::write_item`] call is independent.
pub struct ItemWriter<'a, A> {
    output_root: PathBuf,
    attachments: &'a A,
    extension_filter: Option<Vec<String>>,
}

impl<'a, A: AttachmentSource> ItemWriter<'a, A> {
    pub fn new(output_root: impl Into<PathBuf>, attachments: &'a A) -> Self {
        Self {
            output_root: output_root.into(),
            attachments,
            extension_filter: None,
        }
    }

    /// Restrict saved attachments to these extensions. Entries are
    /// normalized to lowercase with a leading dot; blanks are dropped.
    /// An empty list leaves the filter off.
    #[must_use]
    pub fn with_extension_filter(mut self, extensions: &[String]) -> Self {
        let normalized: Vec<String> = extensions
            .iter()
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .map(|e| {
                if e.starts_with('.') {
                    e
                } else {
                    format!(".{e}")
                }
            })
            .collect();
        if !normalized.is_empty() {
            self.extension_filter = Some(normalized);
        }
        self
    }

    /// Persist one message: directory, body file, metadata sidecar, and
    /// (when flagged) attachments.
    ///
    /// Missing `receivedDateTime`, sender, or body fail the item. An
    /// attachment-stage failure is logged but leaves the item successful —
    /// body and metadata are already on disk at that point.
    pub fn write_item(&self, message: &Message) -> Result<ItemRecord> {
        let received = message
            .received_date_time
            .ok_or(GraphError::MissingField("receivedDateTime"))?;
        let sender = message
            .sender_address()
            .ok_or(GraphError::MissingField("sender"))?;
        let body = message
            .body
            .as_ref()
            .ok_or(GraphError::MissingField("body"))?;

        let dir = unique_path(
            &self
                .output_root
                .join(item_dir_name(&received, message.subject_or_default())),
        );
        std::fs::create_dir_all(&dir).map_err(|e| GraphError::io(&dir, e))?;

        let mut bytes = write_file(&dir.join(body.content_type.body_filename()), body.content.as_bytes())?;

        let metadata = Metadata {
            subject: message.subject.as_deref(),
            sender,
            received_time: received.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            has_attachments: message.has_attachments,
            body_type: body.content_type.as_str(),
        };
        let metadata_json = serde_json::to_string_pretty(&metadata)?;
        bytes += write_file(&dir.join("metadata.json"), metadata_json.as_bytes())?;

        let mut attachments_saved = 0usize;
        if message.has_attachments {
            match save_attachments(
                self.attachments,
                &message.id,
                &dir,
                self.extension_filter.as_deref(),
            ) {
                Ok((saved, att_bytes)) => {
                    attachments_saved = saved;
                    bytes += att_bytes;
                }
                Err(e) => {
                    tracing::warn!(
                        subject = %message.subject_or_default(),
                        error = %e,
                        "Failed to fetch attachments"
                    );
                }
            }
        }

        tracing::info!(
            dir = %dir.display(),
            bytes,
            attachments = attachments_saved,
            "Exported message"
        );

        Ok(ItemRecord {
            dir,
            bytes_written: bytes,
            attachments_saved,
        })
    }
}

fn write_file(path: &Path, data: &[u8]) -> Result<u64> {
    std::fs::write(path, data).map_err(|e| GraphError::io(path, e))?;
    Ok(data.len() as u64)
}
