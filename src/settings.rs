use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::render::InpaintMode;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MIN_TEXT_HEIGHT: f32 = 0.01;

#[derive(Debug, Clone)]
pub struct Settings {
    pub model: String,
    pub base_url: Option<String>,
    pub request_timeout_secs: u64,
    /// Total translation attempts per call; 1 means fail fast.
    pub retry_max_attempts: usize,
    pub detection_languages: Vec<String>,
    pub min_text_height: f32,
    /// Pages processed at once.
    pub page_concurrency: usize,
    pub inpaint_mode: InpaintMode,
    pub overlay_font_family: Option<String>,
    pub overlay_font_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            retry_max_attempts: 1,
            detection_languages: vec!["ko".to_string(), "ja".to_string()],
            min_text_height: DEFAULT_MIN_TEXT_HEIGHT,
            page_concurrency: default_page_concurrency(),
            inpaint_mode: InpaintMode::default(),
            overlay_font_family: None,
            overlay_font_path: None,
        }
    }
}

fn default_page_concurrency() -> usize {
    num_cpus::get().clamp(1, 8)
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    translation: Option<TranslationSettings>,
    detection: Option<DetectionSettings>,
    pipeline: Option<PipelineSettings>,
    overlay: Option<OverlaySettings>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslationSettings {
    model: Option<String>,
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    retry_max_attempts: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct DetectionSettings {
    languages: Option<Vec<String>>,
    min_text_height: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelineSettings {
    page_concurrency: Option<usize>,
    inpaint_mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySettings {
    font_family: Option<String>,
    font_path: Option<String>,
}

/// Loads settings, merging in order: bundled defaults, `settings.toml` and
/// `settings.local.toml` in the working directory, the same pair under the
/// home settings directory, then an explicit extra file.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(translation) = incoming.translation {
            if let Some(model) = translation.model {
                if !model.trim().is_empty() {
                    self.model = model;
                }
            }
            if let Some(url) = translation.base_url {
                if !url.trim().is_empty() {
                    self.base_url = Some(url);
                }
            }
            if let Some(timeout) = translation.request_timeout_secs {
                if timeout > 0 {
                    self.request_timeout_secs = timeout;
                }
            }
            if let Some(attempts) = translation.retry_max_attempts {
                if attempts > 0 {
                    self.retry_max_attempts = attempts;
                }
            }
        }
        if let Some(detection) = incoming.detection {
            if let Some(languages) = detection.languages {
                if !languages.is_empty() {
                    self.detection_languages = languages;
                }
            }
            if let Some(height) = detection.min_text_height {
                if height > 0.0 {
                    self.min_text_height = height;
                }
            }
        }
        if let Some(pipeline) = incoming.pipeline {
            if let Some(concurrency) = pipeline.page_concurrency {
                if concurrency > 0 {
                    self.page_concurrency = concurrency;
                }
            }
            if let Some(mode) = pipeline.inpaint_mode {
                if let Some(parsed) = InpaintMode::parse(&mode) {
                    self.inpaint_mode = parsed;
                }
            }
        }
        if let Some(overlay) = incoming.overlay {
            if let Some(family) = overlay.font_family {
                if !family.trim().is_empty() {
                    self.overlay_font_family = Some(family);
                }
            }
            if let Some(path) = overlay.font_path {
                if !path.trim().is_empty() {
                    self.overlay_font_path = Some(path);
                }
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".manga-translator-rust"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge_str(settings: &mut Settings, content: &str) {
        let parsed: SettingsFile = toml::from_str(content).unwrap();
        settings.merge(parsed);
    }

    #[test]
    fn defaults_preserve_the_pipeline_contract() {
        let settings = Settings::default();
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.retry_max_attempts, 1);
        assert_eq!(settings.detection_languages, vec!["ko", "ja"]);
        assert_eq!(settings.min_text_height, 0.01);
        assert_eq!(settings.inpaint_mode, InpaintMode::Blur);
        assert!(settings.page_concurrency >= 1 && settings.page_concurrency <= 8);
    }

    #[test]
    fn merge_overrides_selectively() {
        let mut settings = Settings::default();
        merge_str(
            &mut settings,
            r#"
            [translation]
            model = "gpt-4o"
            retry_max_attempts = 3

            [pipeline]
            page_concurrency = 2
            inpaint_mode = "fill"
            "#,
        );
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.retry_max_attempts, 3);
        assert_eq!(settings.page_concurrency, 2);
        assert_eq!(settings.inpaint_mode, InpaintMode::Fill);
        // Untouched sections keep their defaults.
        assert_eq!(settings.detection_languages, vec!["ko", "ja"]);
    }

    #[test]
    fn blank_and_zero_values_do_not_override() {
        let mut settings = Settings::default();
        merge_str(
            &mut settings,
            r#"
            [translation]
            model = "  "
            request_timeout_secs = 0

            [detection]
            languages = []

            [pipeline]
            inpaint_mode = "sorcery"
            "#,
        );
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.request_timeout_secs, 30);
        assert_eq!(settings.detection_languages, vec!["ko", "ja"]);
        assert_eq!(settings.inpaint_mode, InpaintMode::Blur);
    }
}
