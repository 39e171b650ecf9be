//! PDF Watermark Library
//!
//! A library for stamping a semi-transparent text watermark across every
//! page of a PDF document. This library provides functionality to:
//! - Generate a one-page watermark overlay (rotated, sized-to-fit text)
//! - Composite the overlay onto every page of an existing PDF
//! - Optionally password-protect the output
//! - Extract metadata (page counts, etc.)
//!
//! # Example
//!
//! ```no_run
//! use pdf_watermark::pdf::{apply_watermark, WatermarkConfig};
//! use std::path::Path;
//!
//! let config = WatermarkConfig::new("CONFIDENTIAL", 0.2);
//!
//! apply_watermark(
//!     Path::new("report.pdf"),
//!     Path::new("report-stamped.pdf"),
//!     &config,
//!     Some("hunter2"),
//! ).expect("Failed to watermark PDF");
//! ```

pub mod error;
pub mod pdf;
pub mod validate;

// Re-export commonly used items
pub use error::{Error, Result};
pub use pdf::WatermarkConfig;
