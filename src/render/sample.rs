use image::RgbaImage;
use image::imageops;

use crate::ocr::RectPx;

/// Sampling box margin around the tight text box, pixels per side.
const SAMPLE_MARGIN: f32 = 5.0;
/// Returned for degenerate (zero-area) regions.
const NEUTRAL_BRIGHTNESS: f32 = 0.5;

/// Estimates the background brightness under a text box, in `[0,1]`.
///
/// The box is expanded by `SAMPLE_MARGIN` and rasterized into a working
/// buffer, but the channel averages run over the tight box only. Brightness
/// uses the ITU-R relative-luminance weights on the normalized averages.
pub fn background_brightness(image: &RgbaImage, tight: &RectPx) -> f32 {
    let (width, height) = (image.width(), image.height());
    let expanded = tight.expanded(SAMPLE_MARGIN).clamped(width, height);
    let tight_px = tight.clamped(width, height);
    if expanded.is_empty() || tight_px.is_empty() {
        return NEUTRAL_BRIGHTNESS;
    }

    let crop = imageops::crop_imm(image, expanded.x, expanded.y, expanded.w, expanded.h).to_image();
    let off_x = tight_px.x - expanded.x;
    let off_y = tight_px.y - expanded.y;

    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for y in 0..tight_px.h {
        for x in 0..tight_px.w {
            let px = crop.get_pixel(off_x + x, off_y + y).0;
            sum[0] += px[0] as u64;
            sum[1] += px[1] as u64;
            sum[2] += px[2] as u64;
            count += 1;
        }
    }

    let avg_r = sum[0] as f32 / count as f32 / 255.0;
    let avg_g = sum[1] as f32 / count as f32 / 255.0;
    let avg_b = sum[2] as f32 / count as f32 / 255.0;
    let brightness = 0.299 * avg_r + 0.587 * avg_g + 0.114 * avg_b;
    brightness.clamp(0.0, 1.0)
}

/// Text fill and outline colors, always black/white in opposite assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContrastColors {
    pub fill: &'static str,
    pub outline: &'static str,
}

/// Brightness at exactly 0.5 counts as a light background (dark text).
pub fn contrast_colors(brightness: f32) -> ContrastColors {
    if brightness >= 0.5 {
        ContrastColors {
            fill: "#000000",
            outline: "#ffffff",
        }
    } else {
        ContrastColors {
            fill: "#ffffff",
            outline: "#000000",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(width, height, image::Rgba([value, value, value, 255]))
    }

    #[test]
    fn white_background_is_full_brightness() {
        let image = solid(100, 100, 255);
        let b = background_brightness(&image, &RectPx::new(20.0, 20.0, 40.0, 20.0));
        assert!((b - 1.0).abs() < 1e-4);
        assert!(b <= 1.0);
    }

    #[test]
    fn black_background_is_zero_brightness() {
        let image = solid(100, 100, 0);
        let b = background_brightness(&image, &RectPx::new(20.0, 20.0, 40.0, 20.0));
        assert_eq!(b, 0.0);
    }

    #[test]
    fn averages_only_the_tight_box() {
        // Black image with a white tight box; the dark surround inside the
        // expanded sampling area must not drag the average down.
        let mut image = solid(100, 100, 0);
        for y in 20..40 {
            for x in 20..60 {
                image.put_pixel(x, y, image::Rgba([255, 255, 255, 255]));
            }
        }
        let b = background_brightness(&image, &RectPx::new(20.0, 20.0, 40.0, 20.0));
        assert!((b - 1.0).abs() < 1e-4);
    }

    #[test]
    fn degenerate_region_is_neutral() {
        let image = solid(10, 10, 255);
        let b = background_brightness(&image, &RectPx::new(4.0, 4.0, 0.0, 5.0));
        assert_eq!(b, 0.5);

        let outside = background_brightness(&image, &RectPx::new(50.0, 50.0, 5.0, 5.0));
        assert_eq!(outside, 0.5);
    }

    #[test]
    fn boundary_brightness_selects_dark_text() {
        let colors = contrast_colors(0.5);
        assert_eq!(colors.fill, "#000000");
        assert_eq!(colors.outline, "#ffffff");

        let dark = contrast_colors(0.49);
        assert_eq!(dark.fill, "#ffffff");
        assert_eq!(dark.outline, "#000000");
    }
}
