//! Operator-facing operations.
//!
//! A front end collects raw input into a [`BroadcastForm`], calls these
//! functions, and renders whatever comes back. Nothing here keeps state
//! between calls.

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppResult;
use crate::messenger::{
    spawn_broadcast, upload_attachments, AttachmentRef, AttachmentUploadReport, BroadcastHandle,
    BroadcastRequest, MaxClient, MessageSender, RunSummary,
};
use crate::recipients::{self, RecipientId};
use crate::security::InputValidator;

/// Raw operator input, as typed.
#[derive(Debug, Clone, Default)]
pub struct BroadcastForm {
    pub token: String,
    /// Comma separated ids.
    pub recipients_text: String,
    pub message: String,
    pub attachments: Vec<AttachmentRef>,
}

impl BroadcastForm {
    pub fn into_request(self) -> AppResult<BroadcastRequest> {
        let token = self.token.trim().to_string();
        let message = self.message.trim().to_string();
        let recipients = recipients::parse_inline(&self.recipients_text);

        let request = BroadcastRequest::new(token, recipients, message, self.attachments);
        request.validate()?;
        Ok(request)
    }
}

pub struct LoadedRecipients {
    pub ids: Vec<RecipientId>,
    pub summary: String,
}

pub fn load_recipients(path: &Path) -> AppResult<LoadedRecipients> {
    let ids = recipients::load_from_file(path)?;
    let summary = format!("Loaded {} IDs", ids.len());
    Ok(LoadedRecipients { ids, summary })
}

/// Upload files for the next run. The token is checked before any file is touched.
pub async fn attach_files(
    client: &MaxClient,
    token: &str,
    paths: &[String],
    config: &Config,
) -> AppResult<AttachmentUploadReport> {
    InputValidator::validate_token(token)?;

    Ok(upload_attachments(client, token.trim(), paths, config.max_attachment_size_mb).await)
}

pub struct PreparedBroadcast {
    pub request: BroadcastRequest,
    /// `None` when there were no files to upload.
    pub upload_report: Option<AttachmentUploadReport>,
}

/// Validate the form, then upload `paths` and add whatever uploaded to the request.
///
/// An invalid form returns before any file is uploaded.
pub async fn prepare_broadcast(
    client: &MaxClient,
    form: BroadcastForm,
    paths: &[String],
    config: &Config,
) -> AppResult<PreparedBroadcast> {
    let request = form.into_request()?;

    if paths.is_empty() {
        return Ok(PreparedBroadcast {
            request,
            upload_report: None,
        });
    }

    let report = attach_files(client, request.token(), paths, config).await?;
    Ok(PreparedBroadcast {
        request: request.with_attachments(report.references()),
        upload_report: Some(report),
    })
}

/// Validate the form and start the run in the background.
///
/// Validation errors are returned here, before anything is sent.
pub fn send_bulk<S>(sender: Arc<S>, form: BroadcastForm) -> AppResult<BroadcastHandle>
where
    S: MessageSender + 'static,
{
    start_broadcast(sender, form.into_request()?)
}

pub fn start_broadcast<S>(sender: Arc<S>, request: BroadcastRequest) -> AppResult<BroadcastHandle>
where
    S: MessageSender + 'static,
{
    request.validate()?;
    log::info!("Queued broadcast: {:?}", request);
    Ok(spawn_broadcast(sender, request))
}

pub fn format_summary(summary: &RunSummary) -> String {
    format!("Sent: {}, Errors: {}", summary.delivered, summary.failed)
}

pub fn format_upload_report(report: &AttachmentUploadReport) -> String {
    if report.has_uploads() {
        format!(
            "Uploaded {} files:\n{}",
            report.uploaded.len(),
            report.uploaded_names().join("\n")
        )
    } else {
        "Failed to upload files".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::messenger::broadcast::RecipientOutcome;
    use crate::messenger::Outcome;

    fn form(token: &str, ids: &str, message: &str) -> BroadcastForm {
        BroadcastForm {
            token: token.to_string(),
            recipients_text: ids.to_string(),
            message: message.to_string(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn form_is_trimmed_into_a_request() {
        let request = form("  tok  ", " 1, 2 ,3", "\n Hello \n").into_request().unwrap();
        assert_eq!(request.token(), "tok");
        assert_eq!(request.message(), "Hello");
        assert_eq!(
            request.recipients(),
            &[RecipientId::from("1"), RecipientId::from("2"), RecipientId::from("3")]
        );
    }

    #[test]
    fn form_validation_names_the_field() {
        let cases = [
            (form("", "1", "Hi"), "token"),
            (form("tok", " , ", "Hi"), "recipients"),
            (form("tok", "1", "   "), "message"),
        ];

        for (input, expected_field) in cases {
            match input.into_request() {
                Err(AppError::Validation { field, .. }) => assert_eq!(field, expected_field),
                other => panic!("expected validation error, got {:?}", other.map(|_| ())),
            }
        }
    }

    #[test]
    fn summary_text() {
        let summary = RunSummary {
            run_id: uuid::Uuid::new_v4(),
            started_at: chrono::Utc::now(),
            finished_at: chrono::Utc::now(),
            total: 2,
            delivered: 1,
            failed: 1,
            outcomes: vec![
                RecipientOutcome {
                    recipient: RecipientId::from("1"),
                    outcome: Outcome::Delivered,
                },
                RecipientOutcome {
                    recipient: RecipientId::from("2"),
                    outcome: Outcome::Failed(crate::errors::DeliveryFailure::Transport(
                        "timeout".to_string(),
                    )),
                },
            ],
        };
        assert_eq!(format_summary(&summary), "Sent: 1, Errors: 1");
    }

    #[test]
    fn upload_report_text() {
        assert_eq!(
            format_upload_report(&AttachmentUploadReport::default()),
            "Failed to upload files"
        );
    }

    #[test]
    fn load_recipients_reports_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.txt");
        std::fs::write(&path, "1\n2\n3\n").unwrap();

        let loaded = load_recipients(&path).unwrap();
        assert_eq!(loaded.ids.len(), 3);
        assert_eq!(loaded.summary, "Loaded 3 IDs");
    }
}
