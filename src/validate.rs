//! Collaborator-facing input validation
//!
//! These checks run before any file I/O so bad requests are rejected without
//! touching the filesystem. The non-ASCII check feeds the front end's
//! confirmation prompt; declining that prompt is a cancellation, not an
//! error, so it stays out of the error enum.

use std::path::Path;

use crate::error::{Error, Result};

/// True if the text contains any character outside the ASCII range.
///
/// The built-in Helvetica font only covers ASCII reliably, so anything
/// beyond it may render incorrectly and the user should confirm first.
pub fn contains_non_ascii(text: &str) -> bool {
    !text.is_ascii()
}

/// Validate a watermark request before any file is opened
///
/// Checks, in order: the input file exists, the watermark text is non-empty,
/// and a password (when protection is requested) is non-empty.
pub fn validate_request(input: &Path, text: &str, password: Option<&str>) -> Result<()> {
    if !input.exists() {
        return Err(Error::FileNotFound(input.to_path_buf()));
    }

    if text.is_empty() {
        return Err(Error::Validation(
            "watermark text must not be empty".to_string(),
        ));
    }

    if let Some(pw) = password {
        if pw.is_empty() {
            return Err(Error::Validation(
                "password must not be empty when protection is requested".to_string(),
            ));
        }
    }

    Ok(())
}
