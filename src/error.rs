//! Error types for the PDF watermark library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF watermark library
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid user input, rejected before any file I/O happens
    #[error("invalid input: {0}")]
    Validation(String),

    /// Source document could not be loaded or parsed
    #[error("failed to read {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    /// Overlay page generation failed
    #[error("failed to render watermark overlay: {0}")]
    Render(String),

    /// Serialization, encryption or filesystem failure at output time
    #[error("failed to write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },

    /// File not found
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),
}
