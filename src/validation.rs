//! Input checks shared by the API and the admin forms. Everything here is pure.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const MIN_COMMENT_CHARS: usize = 2;
pub const MAX_COMMENT_CHARS: usize = 500;
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg"];
pub const ALLOWED_CONTENT_TYPE: &str = "image/jpeg";

/// A request was well-formed but its content is not acceptable.
/// The display text is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid email")]
    InvalidEmail,

    #[error("Comment too short")]
    CommentTooShort,

    #[error("Comment too long (maximum 500 characters)")]
    CommentTooLong,

    #[error("No file selected")]
    NoFile,

    #[error("Uploader email is invalid")]
    InvalidUploaderEmail,

    #[error("Email is not allowed to upload")]
    UploaderNotAllowed,

    #[error("Title is required")]
    MissingTitle,

    #[error("Only JPG files are allowed, got: {0}")]
    ExtensionNotAllowed(String),

    #[error("File type must be JPG (image/jpeg), got: {0}")]
    WrongContentType(String),

    #[error("File too large: {:.2}MB (maximum 5MB)", megabytes(.0))]
    FileTooLarge(usize),

    #[error("Upload too large (maximum 5MB)")]
    PayloadTooLarge,

    #[error("Invalid request body")]
    MalformedBody,
}

fn megabytes(bytes: &usize) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is valid")
    })
}

/// Trim and lowercase. `None` becomes the empty string.
pub fn normalize_email(email: Option<&str>) -> String {
    email.unwrap_or("").trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Normalise then validate; the normalised form is what gets stored.
pub fn parse_email(raw: Option<&str>) -> Result<String, ValidationError> {
    let email = normalize_email(raw);
    if is_valid_email(&email) {
        Ok(email)
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

/// Trim and bound-check comment text. Length counts characters, not bytes.
pub fn parse_comment_text(raw: Option<&str>) -> Result<String, ValidationError> {
    let text = raw.unwrap_or("").trim();
    let chars = text.chars().count();
    if chars < MIN_COMMENT_CHARS {
        return Err(ValidationError::CommentTooShort);
    }
    if chars > MAX_COMMENT_CHARS {
        return Err(ValidationError::CommentTooLong);
    }
    Ok(text.to_string())
}

pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// A file part received from the upload form.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Raw upload form fields, before any checks.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub uploader_email: Option<String>,
    pub file: Option<UploadedFile>,
}

/// An upload that passed every check.
#[derive(Debug, Clone)]
pub struct ValidUpload {
    pub title: String,
    /// Stored as entered; an absent field becomes the empty string.
    pub description: String,
    pub uploader_email: String,
    pub file: UploadedFile,
}

impl UploadForm {
    /// Run the upload checks in order; the first failure wins. `allow_listed`
    /// is consulted with the normalised uploader email once it is known to be
    /// syntactically valid.
    pub fn validate<E, F>(self, allow_listed: F) -> Result<Result<ValidUpload, ValidationError>, E>
    where
        F: FnOnce(&str) -> Result<bool, E>,
    {
        let file = match self.file {
            Some(file) if !file.filename.is_empty() && !file.bytes.is_empty() => file,
            _ => return Ok(Err(ValidationError::NoFile)),
        };

        let uploader_email = normalize_email(self.uploader_email.as_deref());
        if !is_valid_email(&uploader_email) {
            return Ok(Err(ValidationError::InvalidUploaderEmail));
        }
        if !allow_listed(&uploader_email)? {
            return Ok(Err(ValidationError::UploaderNotAllowed));
        }

        let title = self.title.as_deref().unwrap_or("").trim().to_string();
        if title.is_empty() {
            return Ok(Err(ValidationError::MissingTitle));
        }

        Ok(check_file(&file).map(|()| ValidUpload {
            title,
            description: self.description.unwrap_or_default(),
            uploader_email,
            file,
        }))
    }
}

fn check_file(file: &UploadedFile) -> Result<(), ValidationError> {
    if !allowed_file(&file.filename) {
        return Err(ValidationError::ExtensionNotAllowed(file.filename.clone()));
    }
    let content_type = file.content_type.as_deref().unwrap_or("");
    if content_type != ALLOWED_CONTENT_TYPE {
        return Err(ValidationError::WrongContentType(content_type.to_string()));
    }
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge(file.bytes.len()));
    }
    Ok(())
}

/// Reduce a client-supplied filename to a safe single path component made of
/// ASCII letters, digits, `_`, `-` and `.`. Separators and whitespace become
/// underscores; leading and trailing dots/underscores are stripped. Falls back
/// to `upload.jpg` when nothing usable (or no allowed extension) remains.
pub fn sanitize_filename(filename: &str) -> String {
    let spaced: String = filename
        .chars()
        .map(|c| match c {
            '/' | '\\' => ' ',
            c => c,
        })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() || !allowed_file(trimmed) {
        return "upload.jpg".to_string();
    }
    trimmed.to_string()
}
