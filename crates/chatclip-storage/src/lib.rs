//! Cloudflare R2 storage for rendered videos.
//!
//! This crate provides:
//! - The `Uploader` capability and its R2 implementation
//! - File upload, presigned URLs, deletion and connectivity checks

pub mod client;
pub mod error;
pub mod uploader;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use uploader::{R2Uploader, UploadedMedia, Uploader};
