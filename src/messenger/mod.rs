// Messaging module - everything that talks to the MAX bot API
//
// Uploading attachments, sending one message, and running a broadcast over a recipient list

pub mod attachments;
pub mod broadcast;
pub mod max_client;
pub mod progress_tracker;

pub use attachments::{upload_attachments, AttachmentUploadReport};
pub use broadcast::{
    run_broadcast, spawn_broadcast, BroadcastHandle, BroadcastRequest, Outcome, RecipientOutcome,
    RunSummary,
};
pub use max_client::{AttachmentRef, MaxClient, MessageSender, OutgoingMessage};
pub use progress_tracker::{BroadcastProgress, ProgressSink, ProgressTracker};
