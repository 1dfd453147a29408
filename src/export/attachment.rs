//! Fetch, decode, and persist message attachments.

use std::path::Path;

use crate::error::{GraphError, Result};
use crate::model::attachment::Attachment;

use super::paths::{sanitize_path_segment, unique_path};

/// Attachment names are capped independently of the directory name.
const ATTACHMENT_NAME_LEN: usize = 150;

/// Where attachment listings come from. `GraphClient` is the real
/// implementation; tests substitute canned lists.
pub trait AttachmentSource {
    fn list_attachments(&self, message_id: &str) -> Result<Vec<Attachment>>;
}

/// Fetch the attachment list of one message and write every file
/// attachment under `{item_dir}/attachments/`.
///
/// Non-file entries (item or reference attachments) are skipped, as are
/// files whose extension is not in `extension_filter` when one is set.
/// A failure on one attachment is logged and does not affect the others.
///
/// Returns `(files_written, bytes_written)`.
pub fn save_attachments<A: AttachmentSource>(
    source: &A,
    message_id: &str,
    item_dir: &Path,
    extension_filter: Option<&[String]>,
) -> Result<(usize, u64)> {
    let entries = source.list_attachments(message_id)?;

    let dir = item_dir.join("attachments");
    std::fs::create_dir_all(&dir).map_err(|e| GraphError::io(&dir, e))?;

    let mut saved = 0usize;
    let mut bytes = 0u64;

    for attachment in &entries {
        if !attachment.is_file() {
            tracing::debug!(kind = %attachment.kind, "Skipping non-file attachment");
            continue;
        }
        if let Some(filter) = extension_filter {
            if !matches_extension(&attachment.name, filter) {
                tracing::debug!(name = %attachment.name, "Skipping filtered attachment");
                continue;
            }
        }
        match save_one(attachment, &dir) {
            Ok(written) => {
                saved += 1;
                bytes += written;
            }
            Err(e) => {
                tracing::warn!(name = %attachment.name, error = %e, "Failed to save attachment");
            }
        }
    }

    Ok((saved, bytes))
}

fn save_one(attachment: &Attachment, dir: &Path) -> Result<u64> {
    let data = attachment.decode_content()?;
    let name = sanitize_path_segment(&attachment.name, ATTACHMENT_NAME_LEN);
    let path = unique_path(&dir.join(name));
    std::fs::write(&path, &data).map_err(|e| GraphError::io(&path, e))?;
    Ok(data.len() as u64)
}

/// Case-insensitive extension match. The filter entries are normalized to
/// lowercase with a leading dot before they reach this point.
fn matches_extension(name: &str, filter: &[String]) -> bool {
    let name = name.to_ascii_lowercase();
    filter.iter().any(|ext| name.ends_with(ext.as_str()))
}
