use std::path::Path;

use crate::security::InputValidator;

use super::max_client::{AttachmentRef, MaxClient};

#[derive(Debug, Clone)]
pub struct UploadedAttachment {
    pub path: String,
    pub file_name: String,
    pub reference: AttachmentRef,
}

#[derive(Debug, Clone)]
pub struct FailedAttachment {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentUploadReport {
    pub uploaded: Vec<UploadedAttachment>,
    pub failed: Vec<FailedAttachment>,
}

impl AttachmentUploadReport {
    /// References to attach to every message of a run, in upload order.
    pub fn references(&self) -> Vec<AttachmentRef> {
        self.uploaded.iter().map(|u| u.reference.clone()).collect()
    }

    pub fn uploaded_names(&self) -> Vec<&str> {
        self.uploaded.iter().map(|u| u.file_name.as_str()).collect()
    }

    pub fn has_uploads(&self) -> bool {
        !self.uploaded.is_empty()
    }
}

/// Upload files one after another. A failed file is reported and skipped;
/// it never prevents the remaining files from being uploaded.
pub async fn upload_attachments(
    client: &MaxClient,
    token: &str,
    paths: &[String],
    max_size_mb: u64,
) -> AttachmentUploadReport {
    let mut report = AttachmentUploadReport::default();

    for path in paths {
        let result = match InputValidator::validate_attachment_path(path, max_size_mb) {
            Ok(()) => client.upload_file(token, path).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(reference) => {
                let file_name = Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string();
                log::info!("Uploaded attachment {}", file_name);
                report.uploaded.push(UploadedAttachment {
                    path: path.clone(),
                    file_name,
                    reference,
                });
            }
            Err(e) => {
                log::warn!("Failed to upload attachment {}: {}", path, e);
                report.failed.push(FailedAttachment {
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "Attachment upload finished: {} uploaded, {} failed",
        report.uploaded.len(),
        report.failed.len()
    );

    report
}
