use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::errors::{AppResult, DeliveryError};
use crate::image_processor;

use super::retry::{deliver, RetryPolicy};
use super::transport::{Attachment, Destination, Transport};

const PHOTO_MIME_TYPE: &str = "image/jpeg";
const DOCUMENT_MIME_TYPE: &str = "application/octet-stream";

/// Where a file is in its upload when something goes wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStage {
    Normalizing,
    SendingRendered,
    SendingRaw,
}

impl fmt::Display for FileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            FileStage::Normalizing => "preparing photo",
            FileStage::SendingRendered => "sending photo",
            FileStage::SendingRaw => "sending document",
        };
        f.write_str(stage)
    }
}

/// What happened in one folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub folder: String,
    pub files: usize,
    pub photos_sent: usize,
    pub documents_sent: usize,
    pub failures: usize,
}

/// Uploads the eligible files of one folder to the folder's topic.
pub struct FolderDispatcher<'a, T: Transport> {
    config: &'a Config,
    transport: &'a T,
    policy: RetryPolicy,
}

impl<'a, T: Transport> FolderDispatcher<'a, T> {
    pub fn new(config: &'a Config, transport: &'a T) -> Self {
        Self {
            config,
            transport,
            policy: config.retry_policy(),
        }
    }

    /// Topic keys are strings, so a folder whose name is not valid UTF-8
    /// always goes to the main chat.
    pub fn destination_for(&self, folder_name: impl AsRef<OsStr>) -> Destination {
        let thread_id = folder_name
            .as_ref()
            .to_str()
            .and_then(|name| self.config.topic_for(name));
        Destination::new(self.config.chat_id.clone(), thread_id)
    }

    /// Upload every eligible file in `folder_name`. Failures are logged and
    /// never stop the folder.
    pub async fn process(&self, folder_name: impl AsRef<OsStr>) -> FolderSummary {
        let folder_name = folder_name.as_ref();
        let folder_path = self.config.folder_path.join(folder_name);
        let destination = self.destination_for(folder_name);
        let folder_name = folder_name.to_string_lossy();
        let mut summary = FolderSummary {
            folder: folder_name.to_string(),
            ..FolderSummary::default()
        };

        log::info!("Processing folder: {} -> {}", folder_name, destination);

        let candidates = match list_candidates(&folder_path, self.config) {
            Ok(candidates) => candidates,
            Err(e) => {
                log::error!("Failed to read folder {}: {}", folder_path.display(), e);
                return summary;
            }
        };

        for file_path in candidates {
            summary.files += 1;
            self.process_file(&file_path, &destination, &mut summary)
                .await;
        }

        log::info!(
            "Finished processing folder: {} ({} files, {} failed deliveries)",
            folder_name,
            summary.files,
            summary.failures
        );
        summary
    }

    async fn process_file(
        &self,
        file_path: &Path,
        destination: &Destination,
        summary: &mut FolderSummary,
    ) {
        let file_name = file_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let timeout = self.config.request_timeout();

        let photo = match image_processor::normalize(file_path, self.config.resize_bounds()) {
            Ok(photo) => photo,
            Err(e) => {
                self.log_failure(&file_name, FileStage::Normalizing, &e);
                summary.failures += 1;
                return;
            }
        };

        let (width, height) = photo.dimensions();
        log::debug!(
            "Prepared {} as {}x{} JPEG ({} bytes)",
            file_name,
            width,
            height,
            photo.len()
        );

        let photo_name = rendered_file_name(file_path);
        let attachment = Attachment::new(&photo_name, PHOTO_MIME_TYPE, photo.as_bytes());
        log::info!("Sending {} as photo...", file_name);

        let label = format!("{} as photo", file_name);
        match deliver(&self.policy, &label, || {
            self.transport.send_photo(destination, attachment, timeout)
        })
        .await
        {
            Ok(attempts) => {
                summary.photos_sent += 1;
                log::info!("Sent {} as photo (attempt {})", file_name, attempts);
            }
            Err(e) => {
                self.log_delivery_failure(&file_name, FileStage::SendingRendered, &e);
                summary.failures += 1;
            }
        }
        drop(photo);

        let raw = match tokio::fs::read(file_path).await {
            Ok(raw) => raw,
            Err(e) => {
                self.log_failure(&file_name, FileStage::SendingRaw, &e);
                summary.failures += 1;
                return;
            }
        };

        let attachment = Attachment::new(&file_name, DOCUMENT_MIME_TYPE, &raw);
        log::info!("Sending {} as document...", file_name);

        let label = format!("{} as document", file_name);
        match deliver(&self.policy, &label, || {
            self.transport.send_document(destination, attachment, timeout)
        })
        .await
        {
            Ok(attempts) => {
                summary.documents_sent += 1;
                log::info!("Sent {} as document (attempt {})", file_name, attempts);
            }
            Err(e) => {
                self.log_delivery_failure(&file_name, FileStage::SendingRaw, &e);
                summary.failures += 1;
            }
        }
    }

    fn log_failure(&self, file_name: &str, stage: FileStage, error: &dyn fmt::Display) {
        log::error!("Failed to send {} ({}): {}", file_name, stage, error);
    }

    fn log_delivery_failure(&self, file_name: &str, stage: FileStage, error: &DeliveryError) {
        log::error!(
            "Failed to send {} ({}) after {} attempt(s): {}",
            file_name,
            stage,
            error.attempts(),
            error
        );
    }
}

/// A regular file with one of the configured extensions.
pub fn is_candidate(path: &Path, config: &Config) -> bool {
    path.is_file() && config.is_allowed_extension(path)
}

/// Eligible files of `folder_path`, in directory listing order.
pub fn list_candidates(folder_path: &Path, config: &Config) -> AppResult<Vec<PathBuf>> {
    let mut candidates = Vec::new();

    for entry in fs::read_dir(folder_path)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", folder_path.display(), e);
                continue;
            }
        };

        if is_candidate(&path, config) {
            candidates.push(path);
        }
    }

    Ok(candidates)
}

fn rendered_file_name(file_path: &Path) -> String {
    let stem = file_path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();
    format!("{}.jpg", stem)
}
