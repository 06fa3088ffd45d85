mod font;
mod inpaint;
mod overlay;
mod sample;

use std::io::Cursor;
use std::sync::Arc;

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::RgbaImage;
use resvg::render;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use crate::error::PipelineError;

pub use font::{OverlayFont, resolve_overlay_font};
pub use inpaint::{InpaintMode, inpaint};
pub use overlay::{OverlayStyle, overlay_text};
pub use sample::{ContrastColors, background_brightness, contrast_colors};

/// Rasterizes an SVG compositing description to an RGBA buffer. Both the
/// inpainting mask and the text overlay go through here; a rasterization
/// failure is fatal to the page's run.
pub(crate) fn rasterize_svg(svg: &str, font_data: Option<&[u8]>) -> Result<RgbaImage> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    if let Some(data) = font_data {
        db.load_font_data(data.to_vec());
    }
    let options = Options {
        fontdb: Arc::new(db),
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options)
        .map_err(|err| PipelineError::ProcessingFailed(format!("failed to parse SVG: {}", err)))?;
    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height())
        .ok_or_else(|| PipelineError::ProcessingFailed("empty raster size".to_string()))?;
    let mut pixmap_mut = pixmap.as_mut();
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
    let image = RgbaImage::from_raw(size.width(), size.height(), pixmap.data().to_vec())
        .ok_or_else(|| {
            PipelineError::ProcessingFailed("failed to build image buffer from raster".to_string())
        })?;
    Ok(image)
}

/// PNG-encodes a buffer as a base64 data URI for embedding in an SVG
/// `<image>` element.
pub(crate) fn png_data_uri(image: &RgbaImage) -> Result<String> {
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    image
        .write_to(&mut cursor, image::ImageFormat::Png)
        .map_err(|err| {
            PipelineError::ProcessingFailed(format!("failed to encode image: {}", err))
        })?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(bytes)))
}

pub(crate) fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
