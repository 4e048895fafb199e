use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::config::ChatId;
use crate::errors::TransportError;

/// Where a message goes: the chat plus an optional forum topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub chat_id: ChatId,
    pub thread_id: Option<i64>,
}

impl Destination {
    pub fn new(chat_id: ChatId, thread_id: Option<i64>) -> Self {
        Self { chat_id, thread_id }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.thread_id {
            Some(thread_id) => write!(f, "{} (topic {})", self.chat_id, thread_id),
            None => write!(f, "{} (general)", self.chat_id),
        }
    }
}

/// A named blob to upload.
#[derive(Debug, Clone, Copy)]
pub struct Attachment<'a> {
    pub file_name: &'a str,
    pub mime_type: &'a str,
    pub data: &'a [u8],
}

impl<'a> Attachment<'a> {
    pub fn new(file_name: &'a str, mime_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            file_name,
            mime_type,
            data,
        }
    }
}

/// The chat service as seen by the uploader. One call is one attempt; the
/// caller owns retries.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an image the service renders inline.
    async fn send_photo(
        &self,
        destination: &Destination,
        photo: Attachment<'_>,
        timeout: Duration,
    ) -> Result<(), TransportError>;

    /// Send a file as a generic attachment, untouched.
    async fn send_document(
        &self,
        destination: &Destination,
        document: Attachment<'_>,
        timeout: Duration,
    ) -> Result<(), TransportError>;
}
