use crate::config::Config;
use crate::errors::{AppError, AppResult, DeliveryFailure};
use crate::recipients::RecipientId;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::time::Duration;

/// How much of an error body is kept for diagnostics.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Reference to a file previously uploaded to the platform.
///
/// The value is whatever the upload endpoint returned as `attachment_id`
/// and is sent back untouched in the `attachments` array of every message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentRef(serde_json::Value);

impl AttachmentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(serde_json::Value::String(id.into()))
    }

    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        if value.is_null() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// One message addressed to one recipient.
#[derive(Debug, Clone, Copy)]
pub struct OutgoingMessage<'a> {
    pub recipient: &'a RecipientId,
    pub text: &'a str,
    pub attachments: &'a [AttachmentRef],
}

/// Anything able to push a single message to a single recipient.
#[async_trait::async_trait]
pub trait MessageSender: Send + Sync {
    async fn deliver(
        &self,
        token: &str,
        message: &OutgoingMessage<'_>,
    ) -> Result<(), DeliveryFailure>;
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    user_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "no_attachments")]
    attachments: &'a [AttachmentRef],
}

fn no_attachments(attachments: &&[AttachmentRef]) -> bool {
    attachments.is_empty()
}

/// HTTP client for the MAX bot API
pub struct MaxClient {
    client: Client,
    api_base: String,
}

impl MaxClient {
    pub fn new(api_base: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(&config.api_base, config.request_timeout())
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    /// Upload one file and return the reference the platform assigned to it.
    pub async fn upload_file(&self, token: &str, file_path: &str) -> AppResult<AttachmentRef> {
        let payload = UploadPayload::from_file(file_path).await?;
        let form = payload.build_form()?;

        log::debug!(
            "Uploading {} ({} bytes, {})",
            payload.file_name,
            payload.data.len(),
            payload.mime_type
        );

        let response = self
            .client
            .post(self.endpoint("upload"))
            .query(&[("access_token", token)])
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(AppError::upload_failed(
                file_path,
                format!("HTTP {}: {}", status.as_u16(), truncate(&response_text)),
            ));
        }

        extract_attachment_id(&response_text).ok_or_else(|| {
            AppError::upload_failed(file_path, "response did not contain an attachment_id")
        })
    }
}

#[async_trait::async_trait]
impl MessageSender for MaxClient {
    async fn deliver(
        &self,
        token: &str,
        message: &OutgoingMessage<'_>,
    ) -> Result<(), DeliveryFailure> {
        let user_id = message
            .recipient
            .user_id()
            .ok_or_else(|| DeliveryFailure::InvalidRecipient(message.recipient.to_string()))?;

        let payload = MessagePayload {
            user_id,
            text: message.text,
            attachments: message.attachments,
        };

        let response = self
            .client
            .post(self.endpoint("messages"))
            .query(&[("access_token", token)])
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(DeliveryFailure::Rejected {
            status: status.as_u16(),
            body: truncate(&error_text),
        })
    }
}

/// File contents ready to go into a multipart body
#[derive(Debug, Clone)]
pub struct UploadPayload {
    file_name: String,
    data: Vec<u8>,
    mime_type: &'static str,
}

impl UploadPayload {
    pub async fn from_file(file_path: &str) -> AppResult<Self> {
        let data = tokio::fs::read(file_path).await?;
        let file_name = Path::new(file_path)
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Ok(Self {
            mime_type: mime_type_for(file_path),
            file_name,
            data,
        })
    }

    pub fn build_form(&self) -> AppResult<multipart::Form> {
        let part = multipart::Part::bytes(self.data.clone())
            .file_name(self.file_name.clone())
            .mime_str(self.mime_type)?;

        Ok(multipart::Form::new().part("file", part))
    }
}

fn mime_type_for(file_path: &str) -> &'static str {
    let extension = Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("mp4") => "video/mp4",
        Some("mp3") => "audio/mpeg",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Pull `attachment_id` out of an upload response.
pub fn extract_attachment_id(response_data: &str) -> Option<AttachmentRef> {
    match serde_json::from_str::<serde_json::Value>(response_data) {
        Ok(mut json) => {
            let id = json
                .get_mut("attachment_id")
                .map(serde_json::Value::take)
                .and_then(AttachmentRef::from_value);
            if id.is_none() {
                log::warn!(
                    "Upload response has no attachment_id: {}",
                    truncate(response_data)
                );
            }
            id
        }
        Err(e) => {
            log::error!("Failed to parse upload response as JSON: {}", e);
            log::debug!("Raw response that failed to parse: {}", response_data);
            None
        }
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
