//! Export functionality: per-message directory, body, metadata sidecar,
//! and attachment files.

pub mod attachment;
pub mod paths;
pub mod writer;
