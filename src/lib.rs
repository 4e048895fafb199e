//! Uploads folders of photos to Telegram, one forum topic per folder.
//!
//! Each top-level folder under the configured root is processed
//! concurrently. Every eligible image goes out twice: once as a resized
//! photo and once as the untouched original attached as a document.

pub mod config;
pub mod errors;
pub mod image_processor;
pub mod logging;
pub mod topics;
pub mod uploader;
