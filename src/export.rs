use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use crate::page::Page;

/// Writes every processed page to `dir` as PNG, named by store position
/// (`page_001.png`, 1-indexed). Pages without output are silently skipped;
/// a failed write aborts the export but files already written stay.
pub fn export_pages(pages: &[Arc<Page>], dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory: {}", dir.display()))?;

    let mut written = 0usize;
    for (index, page) in pages.iter().enumerate() {
        let Some(image) = page.processed() else {
            debug!("page {}: no processed image, skipping export", page.id());
            continue;
        };
        let file_name = format!("page_{:03}.png", index + 1);
        let path = dir.join(&file_name);
        image
            .save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written += 1;
    }
    info!("exported {} page(s) to {}", written, dir.display());
    Ok(written)
}

/// Writes one page's processed image to an explicit path, PNG encoding.
pub fn save_page(page: &Page, path: &Path) -> Result<()> {
    let image = page
        .processed()
        .ok_or_else(|| anyhow!("page {} has no processed image", page.id()))?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))
}
