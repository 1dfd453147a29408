//! Attachment entries from the attachments endpoint.
//!
//! Only file attachments embed their content (base64 in `contentBytes`).
//! Item and reference attachments carry no persistable payload and are
//! skipped by the export.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

use crate::error::{GraphError, Result};

/// `@odata.type` value marking an attachment whose bytes are embedded.
pub const FILE_ATTACHMENT_TYPE: &str = "#microsoft.graph.fileAttachment";

/// One attachment entry of a message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Type discriminator, e.g. `#microsoft.graph.fileAttachment`.
    #[serde(default, rename = "@odata.type")]
    pub kind: String,

    #[serde(default)]
    pub name: String,

    /// MIME type of the content, e.g. `application/pdf`.
    #[serde(default)]
    pub content_type: Option<String>,

    /// Decoded size in bytes as reported by the server.
    #[serde(default)]
    pub size: Option<u64>,

    /// Base64-encoded content; present only on file attachments.
    #[serde(default)]
    pub content_bytes: Option<String>,
}

impl Attachment {
    /// Whether this entry is a file attachment with embedded content.
    pub fn is_file(&self) -> bool {
        self.kind.contains(FILE_ATTACHMENT_TYPE)
    }

    /// Decode the embedded base64 payload into raw bytes.
    pub fn decode_content(&self) -> Result<Vec<u8>> {
        let encoded = self
            .content_bytes
            .as_deref()
            .ok_or(GraphError::MissingField("contentBytes"))?;
        Ok(STANDARD.decode(encoded)?)
    }
}

/// Response envelope of the attachments listing.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentPage {
    #[serde(default)]
    pub value: Vec<Attachment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_attachment_detected() {
        let att: Attachment = serde_json::from_value(json!({
            "@odata.type": "#microsoft.graph.fileAttachment",
            "name": "report.pdf",
            "contentType": "application/pdf",
            "size": 5,
            "contentBytes": "SGVsbG8="
        }))
        .expect("deserialize");
        assert!(att.is_file());
        assert_eq!(att.decode_content().expect("decode"), b"Hello");
    }

    #[test]
    fn test_item_attachment_is_not_file() {
        let att: Attachment = serde_json::from_value(json!({
            "@odata.type": "#microsoft.graph.itemAttachment",
            "name": "forwarded message"
        }))
        .expect("deserialize");
        assert!(!att.is_file());
    }

    #[test]
    fn test_decode_without_content_is_missing_field() {
        let att: Attachment = serde_json::from_value(json!({
            "@odata.type": "#microsoft.graph.fileAttachment",
            "name": "empty.bin"
        }))
        .expect("deserialize");
        assert!(matches!(
            att.decode_content(),
            Err(GraphError::MissingField("contentBytes"))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let att: Attachment = serde_json::from_value(json!({
            "@odata.type": "#microsoft.graph.fileAttachment",
            "name": "bad.bin",
            "contentBytes": "not base64 at all!!"
        }))
        .expect("deserialize");
        assert!(matches!(att.decode_content(), Err(GraphError::Decode(_))));
    }
}
