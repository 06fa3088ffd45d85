use anyhow::Result;
use image::{GrayImage, Luma, Rgba, RgbaImage, imageops};

use crate::ocr::TextRegion;

use super::rasterize_svg;

/// Mask shapes expand the region box by this much on every side.
const MASK_MARGIN: f32 = 4.0;
const MASK_CORNER_RADIUS: f32 = 2.0;
/// Feathering blur applied to the mask so fills blend into the page.
const MASK_FEATHER_SIGMA: f32 = 2.0;
/// Multi-scale low-pass radii, small to large.
const BLUR_RADII: [f32; 3] = [5.0, 10.0, 20.0];

/// How original text pixels are removed from a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InpaintMode {
    /// Multi-scale blur blending driven by a feathered mask.
    #[default]
    Blur,
    /// Solid white fill of each region box.
    Fill,
}

impl InpaintMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "blur" => Some(InpaintMode::Blur),
            "fill" => Some(InpaintMode::Fill),
            _ => None,
        }
    }
}

/// Removes original-language text from the given regions of the image,
/// filling with plausible surrounding content. Pixels outside the feathered
/// mask footprint come through untouched.
pub fn inpaint(image: &RgbaImage, regions: &[TextRegion], mode: InpaintMode) -> Result<RgbaImage> {
    match mode {
        InpaintMode::Blur => inpaint_blur(image, regions),
        InpaintMode::Fill => Ok(fill_regions(image, regions)),
    }
}

fn inpaint_blur(image: &RgbaImage, regions: &[TextRegion]) -> Result<RgbaImage> {
    let mask = build_mask(image.width(), image.height(), regions)?;

    // Progressively fold the larger-scale copies into the accumulator where
    // the mask is open, then composite the result over the original.
    let mut filled = imageops::blur(image, BLUR_RADII[0]);
    for radius in &BLUR_RADII[1..] {
        let blurred = imageops::blur(image, *radius);
        filled = blend_with_mask(&blurred, &filled, &mask);
    }
    Ok(blend_with_mask(&filled, image, &mask))
}

/// Black canvas with a feathered white rounded rectangle per region.
fn build_mask(width: u32, height: u32, regions: &[TextRegion]) -> Result<GrayImage> {
    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r##"<rect x="0" y="0" width="{w}" height="{h}" fill="#000000"/>"##,
        w = width,
        h = height
    ));
    for region in regions {
        let rect = region.rect.expanded(MASK_MARGIN);
        svg.push_str(&format!(
            r##"<rect x="{x}" y="{y}" width="{w}" height="{h}" rx="{r}" ry="{r}" fill="#ffffff"/>"##,
            x = rect.x,
            y = rect.y,
            w = rect.w.max(0.0),
            h = rect.h.max(0.0),
            r = MASK_CORNER_RADIUS
        ));
    }
    svg.push_str("</svg>");

    let raster = rasterize_svg(&svg, None)?;
    let gray = GrayImage::from_fn(width, height, |x, y| Luma([raster.get_pixel(x, y).0[0]]));
    Ok(imageops::blur(&gray, MASK_FEATHER_SIGMA))
}

/// Linear per-pixel blend: mask white takes `top`, mask black keeps
/// `bottom`, exact at both extremes.
fn blend_with_mask(top: &RgbaImage, bottom: &RgbaImage, mask: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(top.width(), top.height(), |x, y| {
        let m = mask.get_pixel(x, y).0[0] as u32;
        let t = top.get_pixel(x, y).0;
        let b = bottom.get_pixel(x, y).0;
        let mut out = [0u8; 4];
        for c in 0..4 {
            out[c] = ((t[c] as u32 * m + b[c] as u32 * (255 - m) + 127) / 255) as u8;
        }
        Rgba(out)
    })
}

fn fill_regions(image: &RgbaImage, regions: &[TextRegion]) -> RgbaImage {
    let mut out = image.clone();
    let (width, height) = (image.width(), image.height());
    for region in regions {
        let rect = region.rect.clamped(width, height);
        for y in rect.y..rect.y + rect.h {
            for x in rect.x..rect.x + rect.w {
                out.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
    }
    out
}
