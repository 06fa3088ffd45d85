use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::warn;
use ttf_parser::{Face, name_id};
use usvg::fontdb;

/// Font choice for the overlay renderer. `data` is only set when a font file
/// was loaded explicitly; otherwise the rasterizer falls back to system
/// fonts by family name.
#[derive(Debug, Clone, Default)]
pub struct OverlayFont {
    pub family: Option<String>,
    pub data: Option<Arc<Vec<u8>>>,
}

#[cfg(target_os = "macos")]
fn fallback_families() -> &'static [&'static str] {
    &["NotoSans", "Hiragino Sans", "Helvetica"]
}

#[cfg(target_os = "windows")]
fn fallback_families() -> &'static [&'static str] {
    &["NotoSans", "Arial Unicode", "Arial"]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn fallback_families() -> &'static [&'static str] {
    &["NotoSans", "DejaVu Sans", "Liberation Sans"]
}

/// Resolves the overlay font from an explicit file, a configured family, or
/// the platform fallback list. Resolution is best-effort: with nothing
/// usable the renderer still runs with the rasterizer's default face.
pub fn resolve_overlay_font(font_path: Option<&Path>, font_family: Option<&str>) -> OverlayFont {
    if let Some(path) = font_path {
        match load_font(path) {
            Ok(font) => return font,
            Err(err) => warn!("ignoring overlay font {}: {:#}", path.display(), err),
        }
    }
    if let Some(family) = font_family {
        let family = family.trim();
        if !family.is_empty() {
            return OverlayFont {
                family: Some(family.to_string()),
                data: None,
            };
        }
    }

    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    for candidate in fallback_families() {
        let families = [fontdb::Family::Name(candidate)];
        let query = fontdb::Query {
            families: &families,
            ..Default::default()
        };
        if db.query(&query).is_some() {
            return OverlayFont {
                family: Some((*candidate).to_string()),
                data: None,
            };
        }
    }
    OverlayFont::default()
}

fn load_font(path: &Path) -> Result<OverlayFont> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read font: {}", path.display()))?;
    let face = Face::parse(&data, 0).map_err(|err| anyhow!("failed to parse font: {}", err))?;
    let family = extract_family_name(&face);
    Ok(OverlayFont {
        family,
        data: Some(Arc::new(data)),
    })
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_family_wins_without_a_file() {
        let font = resolve_overlay_font(None, Some("Comic Neue"));
        assert_eq!(font.family.as_deref(), Some("Comic Neue"));
        assert!(font.data.is_none());
    }

    #[test]
    fn unreadable_font_path_falls_through() {
        let font = resolve_overlay_font(
            Some(Path::new("/nonexistent/font.ttf")),
            Some("Backup Family"),
        );
        assert_eq!(font.family.as_deref(), Some("Backup Family"));
    }
}
