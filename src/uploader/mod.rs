// Main uploader module - orchestrates all upload functionality
//
// This module is responsible for delivering folders of photos to Telegram topics

pub mod folder_dispatcher;
pub mod orchestrator;
pub mod retry;
pub mod telegram_client;
pub mod transport;

pub use folder_dispatcher::{FolderDispatcher, FolderSummary};
pub use orchestrator::run;
pub use retry::{deliver, RetryPolicy};
pub use telegram_client::TelegramClient;
pub use transport::{Attachment, Destination, Transport};
