//! Broadcast one message, with optional shared attachments, to a list of
//! MAX users through the bot HTTP API.

pub mod commands;
pub mod config;
pub mod errors;
pub mod messenger;
pub mod recipients;
pub mod security;

pub use errors::{AppError, AppResult, DeliveryFailure};
pub use messenger::{
    run_broadcast, spawn_broadcast, AttachmentRef, BroadcastProgress, BroadcastRequest, MaxClient,
    MessageSender, Outcome, ProgressSink, RunSummary,
};
pub use recipients::RecipientId;
