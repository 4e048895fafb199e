use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use std::time::Duration;

use crate::config::{Config, DEFAULT_API_BASE_URL};
use crate::errors::{classify_status, AppError, AppResult, TransportError};

use super::transport::{Attachment, Destination, Transport};

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

/// The subset of a Bot API `Message` needed for topic discovery.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_thread_id: Option<i64>,
    pub reply_to_message: Option<Box<Message>>,
    pub forum_topic_created: Option<ForumTopicCreated>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForumTopicCreated {
    pub name: String,
}

/// Bot API client for uploading photos and documents
pub struct TelegramClient {
    client: Client,
    bot_url: String,
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> AppResult<Self> {
        Self::with_base_url(DEFAULT_API_BASE_URL, bot_token)
    }

    pub fn with_base_url(base_url: &str, bot_token: &str) -> AppResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, base_url, bot_token))
    }

    pub fn with_client(client: Client, base_url: &str, bot_token: &str) -> Self {
        Self {
            client,
            bot_url: format!("{}/bot{}", base_url.trim_end_matches('/'), bot_token),
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::with_base_url(&config.api_base_url, &config.bot_token)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.bot_url, method)
    }

    async fn upload(
        &self,
        method: &str,
        field_name: &str,
        destination: &Destination,
        attachment: Attachment<'_>,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let form = build_form(field_name, destination, attachment)?;

        log::debug!(
            "{} {} ({} bytes) to {}",
            method,
            attachment.file_name,
            attachment.data.len(),
            destination
        );

        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return match serde_json::from_str::<ApiResponse<serde_json::Value>>(&body) {
                Ok(envelope) if !envelope.ok => Err(rejection(status.as_u16(), &envelope)),
                _ => Ok(()),
            };
        }

        let description = serde_json::from_str::<ApiResponse<serde_json::Value>>(&body)
            .ok()
            .and_then(|envelope| envelope.description)
            .unwrap_or_else(|| body_excerpt(&body));

        Err(classify_status(status.as_u16(), &description))
    }

    /// Fetch pending updates from `getUpdates`.
    pub async fn get_updates(&self) -> AppResult<Vec<Update>> {
        let response = self.client.get(self.method_url("getUpdates")).send().await?;
        let envelope: ApiResponse<Vec<Update>> = response.json().await?;

        if !envelope.ok {
            return Err(AppError::Api {
                code: envelope.error_code.unwrap_or_default(),
                description: envelope
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            });
        }

        Ok(envelope.result.unwrap_or_default())
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send_photo(
        &self,
        destination: &Destination,
        photo: Attachment<'_>,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        self.upload("sendPhoto", "photo", destination, photo, timeout)
            .await
    }

    async fn send_document(
        &self,
        destination: &Destination,
        document: Attachment<'_>,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        self.upload("sendDocument", "document", destination, document, timeout)
            .await
    }
}

fn build_form(
    field_name: &str,
    destination: &Destination,
    attachment: Attachment<'_>,
) -> Result<multipart::Form, TransportError> {
    let mut form = multipart::Form::new().text("chat_id", destination.chat_id.to_string());

    if let Some(thread_id) = destination.thread_id {
        form = form.text("message_thread_id", thread_id.to_string());
    }

    let part = multipart::Part::bytes(attachment.data.to_vec())
        .file_name(attachment.file_name.to_string())
        .mime_str(attachment.mime_type)
        .map_err(|e| TransportError::Malformed(e.to_string()))?;

    Ok(form.part(field_name.to_string(), part))
}

fn rejection(status: u16, envelope: &ApiResponse<serde_json::Value>) -> TransportError {
    let code = envelope
        .error_code
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(status);
    let description = envelope
        .description
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());
    classify_status(code, &description)
}

fn body_excerpt(body: &str) -> String {
    if body.trim().is_empty() {
        return "empty response body".to_string();
    }
    body.chars().take(300).collect()
}
