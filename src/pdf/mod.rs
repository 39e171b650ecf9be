//! PDF manipulation module

pub mod metadata;
pub mod overlay;
pub mod stamp;

// Re-export commonly used items
pub use metadata::{count_pages, extract_metadata, PdfMetadata};
pub use overlay::{build_overlay, create_watermark_pdf, WatermarkConfig};
pub use stamp::{apply_watermark, stamp_document};
