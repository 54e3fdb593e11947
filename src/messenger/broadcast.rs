use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::{AppError, AppResult, DeliveryFailure};
use crate::recipients::RecipientId;
use crate::security::InputValidator;

use super::max_client::{AttachmentRef, MessageSender, OutgoingMessage};
use super::progress_tracker::{BroadcastProgress, ChannelProgressSink, ProgressSink};

/// Everything one run needs, fixed for the duration of that run.
#[derive(Clone)]
pub struct BroadcastRequest {
    token: String,
    recipients: Vec<RecipientId>,
    message: String,
    attachments: Vec<AttachmentRef>,
}

impl BroadcastRequest {
    pub fn new(
        token: impl Into<String>,
        recipients: Vec<RecipientId>,
        message: impl Into<String>,
        attachments: Vec<AttachmentRef>,
    ) -> Self {
        Self {
            token: token.into(),
            recipients,
            message: message.into(),
            attachments,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn recipients(&self) -> &[RecipientId] {
        &self.recipients
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn attachments(&self) -> &[AttachmentRef] {
        &self.attachments
    }

    /// Adds references after those already on the request.
    pub fn with_attachments(mut self, attachments: Vec<AttachmentRef>) -> Self {
        self.attachments.extend(attachments);
        self
    }

    pub fn validate(&self) -> AppResult<()> {
        InputValidator::validate_token(&self.token)?;
        InputValidator::validate_recipients(&self.recipients)?;
        InputValidator::validate_message(&self.message)?;
        Ok(())
    }
}

// Keeps the access token out of logs.
impl fmt::Debug for BroadcastRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastRequest")
            .field("token", &"***")
            .field("recipients", &self.recipients.len())
            .field("message_chars", &self.message.chars().count())
            .field("attachments", &self.attachments)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Delivered,
    Failed(DeliveryFailure),
}

impl Outcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientOutcome {
    pub recipient: RecipientId,
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub delivered: usize,
    pub failed: usize,
    pub outcomes: Vec<RecipientOutcome>,
}

impl RunSummary {
    pub fn failures(&self) -> impl Iterator<Item = (&RecipientId, &DeliveryFailure)> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            Outcome::Failed(reason) => Some((&o.recipient, reason)),
            Outcome::Delivered => None,
        })
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}

/// Send `request` to every recipient in order, one attempt each.
///
/// Validation failures return before anything is sent. Once the loop starts it
/// always runs to the end; per-recipient failures are only recorded.
pub async fn run_broadcast<S>(
    sender: &S,
    request: &BroadcastRequest,
    sink: &dyn ProgressSink,
) -> AppResult<RunSummary>
where
    S: MessageSender + ?Sized,
{
    request.validate()?;

    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let total = request.recipients.len();
    let token = request.token.trim();

    log::info!(
        "Starting broadcast {}: {} recipients, {} attachments",
        run_id,
        total,
        request.attachments.len()
    );

    let mut delivered = 0;
    let mut failed = 0;
    let mut outcomes = Vec::with_capacity(total);

    for (position, recipient) in request.recipients.iter().enumerate() {
        let message = OutgoingMessage {
            recipient,
            text: &request.message,
            attachments: &request.attachments,
        };

        let outcome = match sender.deliver(token, &message).await {
            Ok(()) => {
                delivered += 1;
                Outcome::Delivered
            }
            Err(reason) => {
                log::warn!("Delivery to {} failed: {}", recipient, reason);
                failed += 1;
                Outcome::Failed(reason)
            }
        };

        outcomes.push(RecipientOutcome {
            recipient: recipient.clone(),
            outcome,
        });

        sink.emit(BroadcastProgress {
            index: position + 1,
            total,
            delivered,
            failed,
        });
    }

    let summary = RunSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        total,
        delivered,
        failed,
        outcomes,
    };

    log::info!(
        "Broadcast {} completed: {}/{} delivered, {} failed",
        run_id,
        summary.delivered,
        summary.total,
        summary.failed
    );

    Ok(summary)
}

/// A run executing on the tokio runtime.
pub struct BroadcastHandle {
    progress: UnboundedReceiver<BroadcastProgress>,
    join: JoinHandle<AppResult<RunSummary>>,
}

impl BroadcastHandle {
    /// Next progress event, `None` once the run has finished.
    pub async fn next_progress(&mut self) -> Option<BroadcastProgress> {
        self.progress.recv().await
    }

    pub async fn wait(self) -> AppResult<RunSummary> {
        self.join
            .await
            .map_err(|e| AppError::Internal(format!("Broadcast task failed: {}", e)))?
    }
}

/// Move a run onto a background task so the caller stays responsive.
pub fn spawn_broadcast<S>(sender: Arc<S>, request: BroadcastRequest) -> BroadcastHandle
where
    S: MessageSender + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    let join = tokio::spawn(async move {
        let sink = ChannelProgressSink::new(tx);
        run_broadcast(sender.as_ref(), &request, &sink).await
    });

    BroadcastHandle { progress: rx, join }
}
