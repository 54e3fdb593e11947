use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("File too large: {path}. Maximum size is {max_mb}MB.")]
    FileTooLarge { path: String, max_mb: u64 },

    #[error("Unsupported recipient list format: {path}. Use a .txt or .csv file.")]
    UnsupportedListFormat { path: String },

    #[error("Upload failed for {path}: {reason}")]
    UploadFailed { path: String, reason: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn file_not_found(path: &str) -> Self {
        Self::FileNotFound {
            path: path.to_string(),
        }
    }

    pub fn file_too_large(path: &str, max_mb: u64) -> Self {
        Self::FileTooLarge {
            path: path.to_string(),
            max_mb,
        }
    }

    pub fn unsupported_list_format(path: &str) -> Self {
        Self::UnsupportedListFormat {
            path: path.to_string(),
        }
    }

    pub fn upload_failed(path: &str, reason: impl Into<String>) -> Self {
        Self::UploadFailed {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Errors raised before any request leaves the machine.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::FileNotFound { .. }
                | AppError::FileTooLarge { .. }
                | AppError::UnsupportedListFormat { .. }
        )
    }
}

/// Why a single recipient did not get the message.
///
/// These never abort a run; they end up in the per-recipient outcome list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    #[error("rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid recipient id '{0}'")]
    InvalidRecipient(String),
}

impl DeliveryFailure {
    pub fn is_rejected(&self) -> bool {
        matches!(self, DeliveryFailure::Rejected { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, DeliveryFailure::Transport(_))
    }
}

impl From<reqwest::Error> for DeliveryFailure {
    fn from(error: reqwest::Error) -> Self {
        DeliveryFailure::Transport(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_flagged_as_pre_run() {
        assert!(AppError::validation("token", "missing").is_validation());
        assert!(AppError::file_not_found("ids.txt").is_validation());
        assert!(AppError::unsupported_list_format("ids.xlsx").is_validation());
        assert!(!AppError::upload_failed("a.png", "HTTP 500").is_validation());
        assert!(!AppError::Config("bad".to_string()).is_validation());
    }

    #[test]
    fn error_messages_name_the_offending_input() {
        let err = AppError::validation("message", "Message text cannot be empty");
        assert_eq!(
            err.to_string(),
            "Validation error: message - Message text cannot be empty"
        );

        let err = AppError::file_too_large("big.zip", 50);
        assert!(err.to_string().contains("big.zip"));
        assert!(err.to_string().contains("50MB"));

        let err = AppError::upload_failed("photo.png", "missing attachment_id");
        assert!(err.to_string().contains("photo.png"));
        assert!(err.to_string().contains("missing attachment_id"));
    }

    #[test]
    fn io_errors_convert() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AppError = io_err.into();
        assert!(matches!(err, AppError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn delivery_failure_kinds() {
        let rejected = DeliveryFailure::Rejected {
            status: 403,
            body: "forbidden".to_string(),
        };
        assert!(rejected.is_rejected());
        assert!(!rejected.is_transport());
        assert_eq!(rejected.to_string(), "rejected with HTTP 403: forbidden");

        let transport = DeliveryFailure::Transport("connection refused".to_string());
        assert!(transport.is_transport());

        let invalid = DeliveryFailure::InvalidRecipient("abc".to_string());
        assert_eq!(invalid.to_string(), "invalid recipient id 'abc'");
    }
}
