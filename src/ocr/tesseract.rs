use std::collections::HashMap;
use std::io::Write;
use std::process::Command;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use image::RgbaImage;

use super::{DetectFuture, DetectionConfig, NormBox, RawDetection, TextDetector};

/// Detector adapter over the `tesseract` binary. Words from the TSV output
/// are grouped back into lines and reported in the normalized bottom-origin
/// convention the merger expects.
#[derive(Debug, Clone, Default)]
pub struct TesseractDetector;

impl TesseractDetector {
    pub fn new() -> Self {
        Self
    }
}

impl TextDetector for TesseractDetector {
    fn detect(&self, image: Arc<RgbaImage>, config: &DetectionConfig) -> DetectFuture {
        let config = config.clone();
        Box::pin(async move {
            let result =
                tokio::task::spawn_blocking(move || detect_blocking(&image, &config)).await;
            result.with_context(|| "ocr task failed")?
        })
    }
}

fn detect_blocking(image: &RgbaImage, config: &DetectionConfig) -> Result<Vec<RawDetection>> {
    let languages = tesseract_languages(&config.languages)?;
    let mut tmp = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .with_context(|| "failed to create temp file for OCR")?;
    image::DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut tmp, image::ImageFormat::Png)
        .with_context(|| "failed to write temp image for OCR")?;
    tmp.flush().ok();

    let tsv = run_tesseract_tsv(tmp.path(), &languages)?;
    let (width, height) = (image.width(), image.height());
    let mut detections = parse_tsv_detections(&tsv, width, height);
    detections.retain(|det| det.bbox.h >= config.min_text_height);
    Ok(detections)
}

pub fn list_tesseract_languages() -> Result<Vec<String>> {
    let output = Command::new("tesseract")
        .arg("--list-langs")
        .output()
        .with_context(|| "failed to run tesseract --list-langs")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract --list-langs failed: {}", stderr.trim()));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut langs = Vec::new();
    for (idx, line) in stdout.lines().enumerate() {
        // First line is the "List of available languages" banner.
        if idx == 0 {
            continue;
        }
        let value = line.trim();
        if !value.is_empty() {
            langs.push(value.to_string());
        }
    }
    Ok(langs)
}

fn tesseract_languages(languages: &[String]) -> Result<String> {
    let mut mapped = Vec::new();
    for lang in languages {
        let lang = lang.trim();
        if lang.is_empty() {
            continue;
        }
        mapped.push(map_language(lang).to_string());
    }
    if mapped.is_empty() {
        return Err(anyhow!("recognition language list is empty"));
    }
    Ok(mapped.join("+"))
}

/// ISO 639-1 to tesseract language-pack names; three-letter codes pass
/// through untouched.
fn map_language(code: &str) -> &str {
    match code {
        "ko" => "kor",
        "ja" => "jpn",
        "en" => "eng",
        "zh" => "chi_sim",
        other => other,
    }
}

fn run_tesseract_tsv(path: &std::path::Path, languages: &str) -> Result<String> {
    let output = Command::new("tesseract")
        .arg(path)
        .arg("stdout")
        .arg("-l")
        .arg(languages)
        .arg("--oem")
        .arg("1")
        .arg("--psm")
        .arg("6")
        .arg("--dpi")
        .arg("300")
        .arg("tsv")
        .output()
        .with_context(|| "failed to run tesseract (is it installed?)")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract failed: {}", stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

struct WordToken {
    text: String,
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

fn parse_tsv_detections(tsv: &str, width: u32, height: u32) -> Vec<RawDetection> {
    let mut word_map: HashMap<(i32, i32, i32, i32), Vec<WordToken>> = HashMap::new();

    for (idx, row) in tsv.lines().enumerate() {
        if idx == 0 {
            continue;
        }
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < 12 {
            continue;
        }
        let level: i32 = cols[0].parse().unwrap_or(0);
        if level != 5 {
            continue;
        }
        let page_num: i32 = cols[1].parse().unwrap_or(0);
        let block_num: i32 = cols[2].parse().unwrap_or(0);
        let par_num: i32 = cols[3].parse().unwrap_or(0);
        let line_num: i32 = cols[4].parse().unwrap_or(0);
        let left: u32 = cols[6].parse().unwrap_or(0);
        let top: u32 = cols[7].parse().unwrap_or(0);
        let w: u32 = cols[8].parse().unwrap_or(0);
        let h: u32 = cols[9].parse().unwrap_or(0);
        let conf: f32 = cols[10].parse().unwrap_or(-1.0);
        let text = cols[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let key = (page_num, block_num, par_num, line_num);
        word_map.entry(key).or_default().push(WordToken {
            text: text.to_string(),
            left,
            top,
            width: w,
            height: h,
        });
    }

    let mut keys = word_map.keys().copied().collect::<Vec<_>>();
    keys.sort();

    let mut detections = Vec::new();
    for key in keys {
        let mut words = word_map.remove(&key).unwrap_or_default();
        words.sort_by_key(|word| word.left);
        if let Some(det) = build_detection(&words, width, height) {
            detections.push(det);
        }
    }
    detections
}

fn build_detection(words: &[WordToken], width: u32, height: u32) -> Option<RawDetection> {
    let first = words.first()?;
    let mut x1 = first.left;
    let mut y1 = first.top;
    let mut x2 = first.left + first.width;
    let mut y2 = first.top + first.height;
    let mut text = String::new();
    for word in words {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&word.text);
        x1 = x1.min(word.left);
        y1 = y1.min(word.top);
        x2 = x2.max(word.left + word.width);
        y2 = y2.max(word.top + word.height);
    }
    Some(RawDetection {
        bbox: px_to_norm(x1, y1, x2 - x1, y2 - y1, width, height),
        text,
    })
}

/// Top-left-origin pixel box to the normalized bottom-origin convention.
fn px_to_norm(x: u32, y: u32, w: u32, h: u32, width: u32, height: u32) -> NormBox {
    let width = width.max(1) as f32;
    let height = height.max(1) as f32;
    NormBox {
        x: x as f32 / width,
        y: (height - y as f32 - h as f32) / height,
        w: w as f32 / width,
        h: h as f32 / height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn groups_tsv_words_into_line_detections() {
        let tsv = format!(
            "{HEADER}\n\
             5\t1\t1\t1\t1\t1\t10\t20\t30\t10\t91.0\thello\n\
             5\t1\t1\t1\t1\t2\t45\t20\t30\t10\t88.0\tworld\n\
             5\t1\t1\t1\t2\t1\t10\t60\t30\t10\t90.0\tagain\n"
        );
        let detections = parse_tsv_detections(&tsv, 100, 100);
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].text, "hello world");
        assert_eq!(detections[0].bbox, NormBox { x: 0.1, y: 0.7, w: 0.65, h: 0.1 });
        assert_eq!(detections[1].text, "again");
    }

    #[test]
    fn skips_non_word_rows_and_rejected_words() {
        let tsv = format!(
            "{HEADER}\n\
             4\t1\t1\t1\t1\t0\t0\t0\t100\t100\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t20\t30\t10\t-1\tghost\n\
             5\t1\t1\t1\t1\t2\t10\t20\t30\t10\t80.0\t \n"
        );
        let detections = parse_tsv_detections(&tsv, 100, 100);
        assert!(detections.is_empty());
    }

    #[test]
    fn pixel_to_normalized_uses_bottom_origin() {
        let bbox = px_to_norm(0, 0, 50, 25, 100, 100);
        assert_eq!(bbox, NormBox { x: 0.0, y: 0.75, w: 0.5, h: 0.25 });
    }

    #[test]
    fn maps_iso_codes_to_tesseract_packs() {
        let langs = tesseract_languages(&["ko".to_string(), "ja".to_string()]).unwrap();
        assert_eq!(langs, "kor+jpn");
        assert!(tesseract_languages(&[]).is_err());
    }
}
