//! Watermark overlay page generation using lopdf
//!
//! Builds a standalone one-page PDF containing the watermark text, drawn
//! rotated 45° in semi-transparent gray. The page is later composited on top
//! of each page of a source document by the stamp module.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::f32::consts::FRAC_1_SQRT_2;

use crate::error::{Error, Result};

/// US Letter page size in points (matches the original canvas)
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;

/// Anchor point of the text baseline in the rotated coordinate system
const TEXT_ANCHOR: (f32, f32) = (200.0, 100.0);

/// Watermark fill color (mid-gray)
const FILL_GRAY: f32 = 0.5;

/// Options for the watermark overlay
///
/// Immutable once constructed; one config describes one watermark.
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    /// Text to render across each page
    pub text: String,
    /// Opacity in (0.0, 1.0]
    pub alpha: f32,
    /// Base font size in points
    pub font_size: f32,
    /// Text length above which the font starts shrinking
    pub max_length: usize,
    /// Floor below which shrinking never goes
    pub min_font_size: f32,
}

impl WatermarkConfig {
    /// Create a config with the default sizing policy (40pt base, shrink
    /// beyond 20 characters, never below 20pt).
    pub fn new(text: impl Into<String>, alpha: f32) -> Self {
        Self {
            text: text.into(),
            alpha,
            font_size: 40.0,
            max_length: 20,
            min_font_size: 20.0,
        }
    }

    /// Font size actually used for rendering.
    ///
    /// Long strings shrink proportionally to the length ratio so they still
    /// fit across the page; the result is always within
    /// `[min_font_size, font_size]`.
    pub fn effective_font_size(&self) -> f32 {
        let len = self.text.chars().count();
        if len > self.max_length {
            let scaled = self.font_size * (self.max_length as f32 / len as f32);
            scaled.max(self.min_font_size)
        } else {
            self.font_size
        }
    }

    /// Check the input constraints before any rendering happens
    pub fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(Error::Validation(
                "watermark text must not be empty".to_string(),
            ));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(Error::Validation(format!(
                "opacity must be in (0.0, 1.0], got {}",
                self.alpha
            )));
        }
        if self.font_size < self.min_font_size {
            return Err(Error::Validation(format!(
                "font size {} is below the minimum {}",
                self.font_size, self.min_font_size
            )));
        }
        Ok(())
    }
}

/// Build the one-page overlay document for a watermark config
///
/// The page carries its own Helvetica font and an ExtGState holding the
/// requested opacity, so its resources can be merged into arbitrary source
/// pages without clashing with whatever those pages already use.
pub fn build_overlay(config: &WatermarkConfig) -> Result<Document> {
    config.validate()?;

    let font_size = config.effective_font_size();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    // Helvetica is one of the 14 standard PDF fonts, no embedding required
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    // Fill and stroke opacity live in the graphics state, not the color
    let gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(config.alpha),
        "CA" => Object::Real(config.alpha),
    });

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
        "ExtGState" => dictionary! {
            "GS1" => gs_id,
        },
    });

    // Rotate the coordinate system 45° about the origin, then draw the text
    // at the anchor point within the rotated system. The whole stream is
    // wrapped in q/Q so the state never leaks into content appended later.
    let (cos, sin) = (FRAC_1_SQRT_2, FRAC_1_SQRT_2);
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec!["GS1".into()]),
            Operation::new(
                "rg",
                vec![FILL_GRAY.into(), FILL_GRAY.into(), FILL_GRAY.into()],
            ),
            Operation::new(
                "cm",
                vec![
                    cos.into(),
                    sin.into(),
                    (-sin).into(),
                    cos.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), font_size.into()]),
            Operation::new("Td", vec![TEXT_ANCHOR.0.into(), TEXT_ANCHOR.1.into()]),
            Operation::new("Tj", vec![Object::string_literal(config.text.as_str())]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    };

    let encoded = content
        .encode()
        .map_err(|e| Error::Render(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    // Resources go on the page itself so the stamp module can lift them
    // straight off the page dictionary
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            PAGE_WIDTH.into(),
            PAGE_HEIGHT.into(),
        ],
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}

/// Serialize the overlay page to an in-memory PDF byte buffer
pub fn create_watermark_pdf(config: &WatermarkConfig) -> Result<Vec<u8>> {
    let mut doc = build_overlay(config)?;
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| Error::Render(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_keeps_base_size() {
        // 12 characters, under the 20-character threshold
        let config = WatermarkConfig::new("CONFIDENTIAL", 0.2);
        assert_eq!(config.effective_font_size(), 40.0);
    }

    #[test]
    fn test_text_at_threshold_keeps_base_size() {
        let config = WatermarkConfig::new("A".repeat(20), 0.2);
        assert_eq!(config.effective_font_size(), 40.0);
    }

    #[test]
    fn test_long_text_shrinks_proportionally() {
        let config = WatermarkConfig::new("THIS DOCUMENT IS STRICTLY CONFIDENTIAL", 0.2);
        let len = config.text.len() as f32;
        assert!(config.text.len() > config.max_length);
        let size = config.effective_font_size();
        // 40 * 20/38 ≈ 21.05, above the floor
        assert!((size - 40.0 * 20.0 / len).abs() < 1e-4);
        assert!(size > 20.0);
    }

    #[test]
    fn test_very_long_text_clamps_to_floor() {
        let config = WatermarkConfig::new("X".repeat(200), 0.2);
        assert_eq!(config.effective_font_size(), 20.0);
    }

    #[test]
    fn test_shrinking_is_monotonic_with_floor() {
        let mut previous = f32::MAX;
        for len in 21..120 {
            let config = WatermarkConfig::new("W".repeat(len), 0.5);
            let size = config.effective_font_size();
            assert!(size <= previous, "size grew at length {}", len);
            assert!(size >= config.min_font_size);
            assert!(size <= config.font_size);
            previous = size;
        }
    }

    #[test]
    fn test_validate_rejects_empty_text() {
        let config = WatermarkConfig::new("", 0.2);
        assert!(matches!(
            config.validate().unwrap_err(),
            crate::Error::Validation(_)
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_alpha() {
        for alpha in [0.0, -0.5, 1.5] {
            let config = WatermarkConfig::new("DRAFT", alpha);
            assert!(config.validate().is_err(), "alpha {} accepted", alpha);
        }
        assert!(WatermarkConfig::new("DRAFT", 1.0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_base_size_below_floor() {
        let mut config = WatermarkConfig::new("DRAFT", 0.2);
        config.font_size = 10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overlay_is_a_single_page() {
        let config = WatermarkConfig::new("CONFIDENTIAL", 0.2);
        let doc = build_overlay(&config).expect("overlay generation failed");
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_overlay_serializes_to_pdf_bytes() {
        let config = WatermarkConfig::new("CONFIDENTIAL", 0.2);
        let bytes = create_watermark_pdf(&config).expect("serialization failed");
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_generation_fails_on_invalid_config() {
        let config = WatermarkConfig::new("", 0.2);
        assert!(build_overlay(&config).is_err());
    }
}
