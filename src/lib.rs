//! `graphpull` — export messages from a Microsoft 365 mailbox via the
//! Graph API.
//!
//! This crate provides the core library: translating search criteria into
//! an OData filter expression, paging through the messages endpoint, and
//! writing each matching message (body, metadata, attachments) to a local
//! directory tree.

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod filter;
pub mod model;
