//! Message types deserialized from the messages endpoint.
//!
//! Every field is optional or defaulted: the page decoder must never reject
//! a whole page because one message is malformed. Required-field checks
//! happen per item at export time, where a failure can be isolated.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One page of the messages listing.
///
/// Items are kept as raw JSON so that each one can be decoded individually;
/// the continuation link, when present, already encodes the original query.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagePage {
    /// Raw message objects of this page.
    #[serde(default)]
    pub value: Vec<serde_json::Value>,

    /// Continuation URL for the next page, absent on the last one.
    #[serde(default, rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// A single mail message, the snapshot the export works from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-side message id, needed for the attachments follow-up call.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub subject: Option<String>,

    /// Body content plus its declared content type.
    #[serde(default)]
    pub body: Option<MessageBody>,

    /// Delivery timestamp; drives the export directory name.
    #[serde(default)]
    pub received_date_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub sender: Option<Recipient>,

    #[serde(default)]
    pub to_recipients: Vec<Recipient>,

    #[serde(default)]
    pub has_attachments: bool,

    /// "high", "normal", or "low".
    #[serde(default)]
    pub importance: Option<String>,

    /// Total message size in bytes as reported by the server.
    #[serde(default)]
    pub size: Option<u64>,
}

impl Message {
    /// The subject, or a placeholder when the server sent none.
    pub fn subject_or_default(&self) -> &str {
        self.subject
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("No Subject")
    }

    /// The sender's bare address, if the message carries one.
    pub fn sender_address(&self) -> Option<&str> {
        self.sender
            .as_ref()
            .map(|r| r.email_address.address.as_str())
            .filter(|a| !a.is_empty())
    }
}

/// Message body: content plus declared content type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    #[serde(default)]
    pub content_type: BodyKind,

    #[serde(default)]
    pub content: String,
}

/// Declared body content type. Anything unrecognized is treated as text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum BodyKind {
    Html,
    #[default]
    Text,
}

impl From<String> for BodyKind {
    fn from(s: String) -> Self {
        if s.eq_ignore_ascii_case("html") {
            Self::Html
        } else {
            Self::Text
        }
    }
}

impl BodyKind {
    /// File name for the exported body.
    pub fn body_filename(self) -> &'static str {
        match self {
            Self::Html => "body.html",
            Self::Text => "body.txt",
        }
    }

    /// The content type as the API spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Text => "text",
        }
    }
}

/// A recipient wrapper as the API nests it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    #[serde(default)]
    pub email_address: EmailAddress,
}

/// A display name plus bare address pair.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAddress {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_full_message() {
        let msg: Message = serde_json::from_value(json!({
            "id": "AAMkAD1",
            "subject": "Quarterly report",
            "body": { "contentType": "html", "content": "<p>Hi</p>" },
            "receivedDateTime": "2024-03-01T09:30:00Z",
            "sender": { "emailAddress": { "name": "Alice", "address": "alice@contoso.com" } },
            "toRecipients": [
                { "emailAddress": { "name": "Bob", "address": "bob@contoso.com" } }
            ],
            "hasAttachments": true,
            "importance": "high",
            "size": 12345
        }))
        .expect("deserialize");

        assert_eq!(msg.id, "AAMkAD1");
        assert_eq!(msg.subject_or_default(), "Quarterly report");
        assert_eq!(msg.sender_address(), Some("alice@contoso.com"));
        assert_eq!(msg.to_recipients.len(), 1);
        assert!(msg.has_attachments);
        assert_eq!(msg.body.as_ref().map(|b| b.content_type), Some(BodyKind::Html));
        assert_eq!(msg.size, Some(12345));
    }

    #[test]
    fn test_deserialize_sparse_message() {
        let msg: Message = serde_json::from_value(json!({ "id": "x" })).expect("deserialize");
        assert_eq!(msg.subject_or_default(), "No Subject");
        assert!(msg.sender_address().is_none());
        assert!(msg.received_date_time.is_none());
        assert!(!msg.has_attachments);
    }

    #[test]
    fn test_blank_subject_uses_placeholder() {
        let msg: Message =
            serde_json::from_value(json!({ "id": "x", "subject": "   " })).expect("deserialize");
        assert_eq!(msg.subject_or_default(), "No Subject");
    }

    #[test]
    fn test_body_kind_fallback() {
        let body: MessageBody =
            serde_json::from_value(json!({ "contentType": "weird", "content": "x" }))
                .expect("deserialize");
        assert_eq!(body.content_type, BodyKind::Text);
        assert_eq!(body.content_type.body_filename(), "body.txt");
    }

    #[test]
    fn test_deserialize_page_with_next_link() {
        let page: MessagePage = serde_json::from_value(json!({
            "value": [ { "id": "a" }, { "id": "b" } ],
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/me/messages?$skip=50"
        }))
        .expect("deserialize");
        assert_eq!(page.value.len(), 2);
        assert!(page.next_link.is_some());
    }

    #[test]
    fn test_deserialize_last_page() {
        let page: MessagePage =
            serde_json::from_value(json!({ "value": [] })).expect("deserialize");
        assert!(page.value.is_empty());
        assert!(page.next_link.is_none());
    }
}
