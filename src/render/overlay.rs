use anyhow::Result;
use image::RgbaImage;

use crate::ocr::{RectPx, TextRegion};

use super::font::OverlayFont;
use super::sample::{background_brightness, contrast_colors};
use super::{escape_xml, png_data_uri, rasterize_svg};

/// Adaptive font size: the smaller of 0.8x the box height and 0.2x the box
/// width.
const FONT_HEIGHT_RATIO: f32 = 0.8;
const FONT_WIDTH_RATIO: f32 = 0.2;
/// Draw rectangle relative to the region box.
const DRAW_WIDTH_RATIO: f32 = 2.0;
const DRAW_HEIGHT_RATIO: f32 = 1.5;
/// Fixed placement heuristic: offset from the region's top-left.
const OFFSET_X_RATIO: f32 = 0.3;
const MIN_VERTICAL_OFFSET: f32 = 50.0;
/// Outline stroke painted under the fill.
const OUTLINE_WIDTH: f32 = 2.0;
/// Approximate cap-height correction to center a baseline-anchored line.
const BASELINE_SHIFT: f32 = 0.35;

#[derive(Debug, Clone)]
pub struct OverlayStyle {
    /// Reserved for font/locale choices per target language; currently
    /// carried through unchanged.
    pub target_lang: String,
    pub font: OverlayFont,
}

impl OverlayStyle {
    pub fn new(target_lang: impl Into<String>, font: OverlayFont) -> Self {
        Self {
            target_lang: target_lang.into(),
            font,
        }
    }
}

/// Draws translated text over the (already inpainted) image. Regions without
/// a translation are left untouched, showing the text-removed background.
pub fn overlay_text(
    image: &RgbaImage,
    regions: &[TextRegion],
    style: &OverlayStyle,
) -> Result<RgbaImage> {
    let (width, height) = (image.width(), image.height());
    let uri = png_data_uri(image)?;

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
        uri = uri,
        w = width,
        h = height
    ));

    for region in regions {
        let Some(text) = region.translated_text.as_deref() else {
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let brightness = background_brightness(image, &region.rect);
        let colors = contrast_colors(brightness);
        let font_size = adaptive_font_size(&region.rect);
        let draw = draw_rect(&region.rect);
        let anchor_x = draw.x + draw.w * 0.5;
        let anchor_y = draw.y + draw.h * 0.5 + font_size * BASELINE_SHIFT;

        let family_attr = match style.font.family.as_deref() {
            Some(family) => format!(r#" font-family="{}""#, escape_xml(family)),
            None => String::new(),
        };
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-size="{size}" font-weight="bold"{family} fill="{fill}" stroke="{stroke}" stroke-width="{sw}" paint-order="stroke" text-anchor="middle">{text}</text>"#,
            x = anchor_x,
            y = anchor_y,
            size = font_size,
            family = family_attr,
            fill = colors.fill,
            stroke = colors.outline,
            sw = OUTLINE_WIDTH,
            text = escape_xml(text)
        ));
    }
    svg.push_str("</svg>");

    rasterize_svg(&svg, style.font.data.as_ref().map(|data| data.as_slice()))
}

fn adaptive_font_size(rect: &RectPx) -> f32 {
    (rect.h * FONT_HEIGHT_RATIO).min(rect.w * FONT_WIDTH_RATIO)
}

/// Fixed placement heuristic, not a centering computation: the draw box is
/// 2x wide and 1.5x tall, shifted right by 0.3x the region width and down by
/// at least 50 px.
fn draw_rect(rect: &RectPx) -> RectPx {
    RectPx {
        x: rect.x + rect.w * OFFSET_X_RATIO,
        y: rect.y + (rect.h * DRAW_HEIGHT_RATIO).max(MIN_VERTICAL_OFFSET),
        w: rect.w * DRAW_WIDTH_RATIO,
        h: rect.h * DRAW_HEIGHT_RATIO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::font::OverlayFont;

    fn white(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]))
    }

    fn style() -> OverlayStyle {
        OverlayStyle::new("en", OverlayFont::default())
    }

    #[test]
    fn font_size_takes_the_smaller_ratio() {
        // Height-limited: 0.8 * 10 = 8 vs 0.2 * 100 = 20.
        assert_eq!(adaptive_font_size(&RectPx::new(0.0, 0.0, 100.0, 10.0)), 8.0);
        // Width-limited: 0.2 * 20 = 4 vs 0.8 * 40 = 32.
        assert_eq!(adaptive_font_size(&RectPx::new(0.0, 0.0, 20.0, 40.0)), 4.0);
    }

    #[test]
    fn draw_rect_applies_the_fixed_offsets() {
        let draw = draw_rect(&RectPx::new(100.0, 200.0, 60.0, 40.0));
        assert_eq!(draw, RectPx::new(118.0, 260.0, 120.0, 60.0));

        // Small regions bottom out at the 50 px vertical offset.
        let small = draw_rect(&RectPx::new(10.0, 10.0, 20.0, 10.0));
        assert_eq!(small, RectPx::new(16.0, 60.0, 40.0, 15.0));
    }

    #[test]
    fn untranslated_regions_leave_the_image_unchanged() {
        let image = white(120, 80);
        let regions = vec![TextRegion::new(RectPx::new(10.0, 10.0, 40.0, 20.0), "原文")];
        let out = overlay_text(&image, &regions, &style()).unwrap();
        assert_eq!((out.width(), out.height()), (120, 80));
        for (x, y) in [(0u32, 0u32), (60, 40), (119, 79)] {
            assert_eq!(out.get_pixel(x, y).0, [255, 255, 255, 255]);
        }
    }

    #[test]
    fn renders_translated_regions() {
        let image = white(400, 300);
        let mut region = TextRegion::new(RectPx::new(40.0, 30.0, 120.0, 40.0), "안녕");
        region.translated_text = Some("Hello".to_string());
        let out = overlay_text(&image, &[region], &style()).unwrap();
        assert_eq!((out.width(), out.height()), (400, 300));
        // Far corner sits outside the draw rect and stays white.
        assert_eq!(out.get_pixel(399, 299).0, [255, 255, 255, 255]);
    }
}
