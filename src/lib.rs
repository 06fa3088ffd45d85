use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use image::RgbaImage;
use tracing::info;

pub mod error;
mod export;
pub mod logging;
mod ocr;
mod page;
mod pipeline;
mod render;
pub mod settings;
mod store;
mod translate;

pub use error::PipelineError;
pub use export::{export_pages, save_page};
pub use ocr::{
    ClampedRect, DetectFuture, DetectionConfig, NormBox, RawDetection, RectPx, TesseractDetector,
    TextDetector, TextRegion, list_tesseract_languages, merge_detections,
};
pub use page::{Page, PageId, PageState};
pub use pipeline::{Pipeline, PipelineConfig};
pub use render::{
    ContrastColors, InpaintMode, OverlayFont, OverlayStyle, background_brightness,
    contrast_colors, inpaint, overlay_text, resolve_overlay_font,
};
pub use store::PageStore;
pub use translate::{
    OpenAiTranslator, RetryPolicy, TranslateApi, TranslateFuture, TranslateOptions, Translation,
};

#[derive(Debug, Clone)]
pub struct Config {
    /// Input page images, processed in order.
    pub inputs: Vec<PathBuf>,
    /// Export directory; no export when unset.
    pub output_dir: Option<PathBuf>,
    /// Target language.
    pub lang: String,
    /// Source language of the page text.
    pub source_lang: String,
    pub model: Option<String>,
    pub key: Option<String>,
    pub settings_path: Option<String>,
}

/// Loads settings, builds the collaborators, runs every input page through
/// the pipeline, and exports the results. Returns a per-page summary.
pub async fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    if config.inputs.is_empty() {
        return Err(anyhow!("no input images given"));
    }

    // Credential problems surface here, once, before any page is touched.
    let key = resolve_credential(config.key.as_deref())?;
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| settings.model.clone());
    let timeout = Duration::from_secs(settings.request_timeout_secs);
    let mut translator = OpenAiTranslator::with_timeout(key, timeout)?
        .with_model(model)
        .with_retry_policy(RetryPolicy::with_attempts(settings.retry_max_attempts));
    if let Some(base_url) = settings.base_url.as_deref() {
        translator = translator.with_base_url(base_url);
    }

    let font = resolve_overlay_font(
        settings.overlay_font_path.as_deref().map(Path::new),
        settings.overlay_font_family.as_deref(),
    );
    let pipeline = Pipeline::new(
        TesseractDetector::new(),
        translator,
        PipelineConfig {
            detection: DetectionConfig {
                languages: settings.detection_languages.clone(),
                min_text_height: settings.min_text_height,
            },
            options: TranslateOptions {
                source_lang: config.source_lang.clone(),
                target_lang: config.lang.clone(),
            },
            inpaint_mode: settings.inpaint_mode,
            style: OverlayStyle::new(config.lang.clone(), font),
            page_concurrency: settings.page_concurrency,
        },
    );

    let store = PageStore::new();
    for input in &config.inputs {
        let image = load_page_image(input)?;
        store.add_page(image);
        info!("added {}", input.display());
    }

    let pages = store.pages();
    pipeline.process_pages(&pages).await;

    let exported = match config.output_dir.as_deref() {
        Some(dir) => export_pages(&pages, dir)?,
        None => 0,
    };

    Ok(format_run_summary(&config, &pages, exported))
}

/// Reads and decodes an input image, sniffing the format first so a clear
/// error names the file instead of a codec guess failing later.
pub fn load_page_image(path: &Path) -> Result<RgbaImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let is_image = infer::get(&bytes)
        .map(|kind| kind.mime_type().starts_with("image/"))
        .unwrap_or(false);
    if !is_image {
        return Err(PipelineError::InvalidImage)
            .with_context(|| format!("{} is not a supported image", path.display()));
    }
    let image = image::load_from_memory(&bytes)
        .map_err(|_| PipelineError::InvalidImage)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(image.to_rgba8())
}

/// Explicit credential resolution, injected into the translator at
/// construction: command-line key, then `OPENAI_API_KEY`, then a `.env`
/// file in the working directory.
fn resolve_credential(override_key: Option<&str>) -> Result<String> {
    if let Some(key) = override_key {
        if !key.trim().is_empty() {
            return Ok(key.to_string());
        }
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.trim().is_empty() {
            return Ok(key);
        }
    }
    if let Some(key) = read_env_file_key(Path::new(".env")) {
        return Ok(key);
    }
    Err(PipelineError::MissingCredential.into())
}

fn read_env_file_key(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    for line in content.lines() {
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        if name.trim() == "OPENAI_API_KEY" {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn format_run_summary(config: &Config, pages: &[std::sync::Arc<Page>], exported: usize) -> String {
    let mut completed = 0usize;
    let mut lines = Vec::new();
    for (input, page) in config.inputs.iter().zip(pages) {
        let status = match page.state() {
            PageState::Completed => {
                completed += 1;
                "completed".to_string()
            }
            PageState::Failed(message) => format!("failed: {}", message),
            PageState::Pending => "pending".to_string(),
            PageState::Processing => "processing".to_string(),
        };
        lines.push(format!("{}\t{}", input.display(), status));
    }
    lines.push(format!("{}/{} page(s) completed", completed, pages.len()));
    if let Some(dir) = config.output_dir.as_deref() {
        lines.push(format!("exported {} page(s) to {}", exported, dir.display()));
    }
    lines.join("\n")
}
