mod geom;
mod merge;
mod tesseract;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use image::RgbaImage;

pub use geom::{ClampedRect, RectPx};
pub use merge::merge_detections;
pub use tesseract::{TesseractDetector, list_tesseract_languages};

/// Normalized bounding box as produced by the OCR convention: fractions of
/// the image dimensions in `[0,1]`, origin measured from the image *bottom*
/// (a higher `y` means higher on the page).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// One raw OCR observation, before merging.
#[derive(Debug, Clone)]
pub struct RawDetection {
    pub bbox: NormBox,
    pub text: String,
}

/// One detected (and, once translated, translatable) text unit.
#[derive(Debug, Clone)]
pub struct TextRegion {
    pub rect: RectPx,
    pub original_text: String,
    pub translated_text: Option<String>,
}

impl TextRegion {
    pub fn new(rect: RectPx, original_text: impl Into<String>) -> Self {
        Self {
            rect,
            original_text: original_text.into(),
            translated_text: None,
        }
    }
}

/// Recognition inputs the detector honors; not core logic.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Source-script languages, ISO 639-1 codes.
    pub languages: Vec<String>,
    /// Minimum text height as a fraction of the image height; shorter
    /// detections are dropped.
    pub min_text_height: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            languages: vec!["ko".to_string(), "ja".to_string()],
            min_text_height: 0.01,
        }
    }
}

pub type DetectFuture = Pin<Box<dyn Future<Output = Result<Vec<RawDetection>>> + Send>>;

/// On-device text detection, consumed as a black box: image in, raw
/// normalized detections out.
pub trait TextDetector: Send + Sync {
    fn detect(&self, image: Arc<RgbaImage>, config: &DetectionConfig) -> DetectFuture;
}
