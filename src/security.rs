use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::errors::{AppError, AppResult};

fn whitespace() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s").expect("static regex"))
}

pub struct InputValidator;

impl InputValidator {
    pub fn validate_token(token: &str) -> AppResult<()> {
        let trimmed = token.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("token", "Access token cannot be empty"));
        }

        if whitespace().is_match(trimmed) {
            return Err(AppError::validation(
                "token",
                "Access token must not contain whitespace",
            ));
        }

        Ok(())
    }

    pub fn validate_message(message: &str) -> AppResult<()> {
        if message.trim().is_empty() {
            return Err(AppError::validation(
                "message",
                "Message text cannot be empty",
            ));
        }

        Ok(())
    }

    pub fn validate_recipients<T>(recipients: &[T]) -> AppResult<()> {
        if recipients.is_empty() {
            return Err(AppError::validation(
                "recipients",
                "Recipient list cannot be empty",
            ));
        }

        Ok(())
    }

    pub fn validate_attachment_path(path: &str, max_size_mb: u64) -> AppResult<()> {
        if path.trim().is_empty() {
            return Err(AppError::validation("file_path", "File path cannot be empty"));
        }

        let path_obj = Path::new(path);

        if !path_obj.exists() {
            return Err(AppError::file_not_found(path));
        }

        if !path_obj.is_file() {
            return Err(AppError::validation("file_path", "Path is not a file"));
        }

        let metadata = std::fs::metadata(path_obj)?;
        if metadata.len() > max_size_mb.saturating_mul(1024 * 1024) {
            return Err(AppError::file_too_large(path, max_size_mb));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn token_rules() {
        assert!(InputValidator::validate_token("abc123").is_ok());
        assert!(InputValidator::validate_token("  abc123  ").is_ok());
        assert!(InputValidator::validate_token("").is_err());
        assert!(InputValidator::validate_token("   ").is_err());
        assert!(InputValidator::validate_token("abc 123").is_err());
        assert!(InputValidator::validate_token(" abc\t123 ").is_err());
    }

    #[test]
    fn message_must_have_text() {
        assert!(InputValidator::validate_message("Hello").is_ok());
        assert!(InputValidator::validate_message("\n\t ").is_err());
    }

    #[test]
    fn recipients_must_not_be_empty() {
        assert!(InputValidator::validate_recipients(&["1"]).is_ok());
        let empty: [&str; 0] = [];
        assert!(InputValidator::validate_recipients(&empty).is_err());
    }

    #[test]
    fn attachment_path_checks() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("doc.pdf");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(b"%PDF-1.4").unwrap();

        let path_str = file_path.to_string_lossy();
        assert!(InputValidator::validate_attachment_path(&path_str, 1).is_ok());

        let missing = dir.path().join("missing.pdf");
        assert!(matches!(
            InputValidator::validate_attachment_path(&missing.to_string_lossy(), 1),
            Err(AppError::FileNotFound { .. })
        ));

        assert!(InputValidator::validate_attachment_path(&dir.path().to_string_lossy(), 1)
            .is_err());
    }

    #[test]
    fn huge_size_limit_does_not_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("small.bin");
        std::fs::write(&file_path, b"abc").unwrap();

        assert!(
            InputValidator::validate_attachment_path(&file_path.to_string_lossy(), u64::MAX)
                .is_ok()
        );
    }

    #[test]
    fn attachment_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("big.bin");
        std::fs::write(&file_path, vec![0u8; 1024 * 1024 + 1]).unwrap();

        assert!(matches!(
            InputValidator::validate_attachment_path(&file_path.to_string_lossy(), 1),
            Err(AppError::FileTooLarge { max_mb: 1, .. })
        ));
    }
}
