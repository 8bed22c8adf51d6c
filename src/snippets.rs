//! # HTML Snippets Module
//!
//! Genera un documento HTML con gli snippet suggeriti per ogni asset ottimizzato.
//!
//! ## Output:
//! - **Immagini**: `<picture>` con un `<source>` per formato e `srcset` basato
//!   sulla larghezza, più un `<img loading="lazy">` di fallback
//! - **Video**: `<video>` con un `<source>` per ogni variante sopravvissuta
//!
//! I path sono scritti relativi alla directory del file di snippet quando
//! possibile, altrimenti assoluti.
//!
//! ## Esempio:
//! ```html
//! <picture>
//!   <source type="image/webp" srcset="img/hero.w320.webp 320w, img/hero.webp 1x">
//!   <img src="img/hero.webp" srcset="img/hero.w320.webp 320w, img/hero.webp 1x" loading="lazy" alt="hero">
//! </picture>
//! ```

use crate::file_manager::FileManager;
use crate::report::{AggregateReport, AssetReport, VariantResult};
use anyhow::Result;
use std::path::Path;
use tracing::debug;

const PREFERRED_IMAGE_FORMAT: &str = "webp";

/// Render the snippets document, with paths relative to `base_dir`
pub fn render_html(report: &AggregateReport, base_dir: &Path) -> String {
    let mut lines = vec![
        "<!doctype html>".to_string(),
        "<html><head><meta charset=\"utf-8\"><title>Snippets</title></head><body>".to_string(),
    ];

    for asset in report.assets.iter().filter(|a| !a.variants.is_empty()) {
        let (videos, images): (Vec<&VariantResult>, Vec<&VariantResult>) =
            asset.variants.iter().partition(|v| FileManager::is_video(&v.path));

        if !images.is_empty() {
            lines.extend(picture_element(asset, &images, base_dir));
        }
        if !videos.is_empty() {
            lines.extend(video_element(&videos, base_dir));
        }
        lines.push("<hr>".to_string());
    }

    lines.push("</body></html>".to_string());
    lines.join("\n")
}

/// Write the snippets document next to its referenced files
pub async fn write_snippets(report: &AggregateReport, path: &Path) -> Result<()> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    if !base_dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(base_dir).await?;
    }
    tokio::fs::write(path, render_html(report, base_dir)).await?;
    debug!("Snippets written to {}", path.display());
    Ok(())
}

fn picture_element(asset: &AssetReport, images: &[&VariantResult], base_dir: &Path) -> Vec<String> {
    // Formats in first-seen order
    let mut groups: Vec<(&str, Vec<&VariantResult>)> = Vec::new();
    for &variant in images {
        match groups.iter_mut().find(|(format, _)| *format == variant.format) {
            Some((_, group)) => group.push(variant),
            None => groups.push((variant.format.as_str(), vec![variant])),
        }
    }
    for (_, group) in groups.iter_mut() {
        // Sized variants ascending, full size last
        group.sort_by_key(|v| v.width.unwrap_or(u32::MAX));
    }

    let mut lines = vec!["<picture>".to_string()];
    for (format, group) in &groups {
        lines.push(format!(
            "  <source type=\"{}\" srcset=\"{}\">",
            image_mime(format),
            escape(&srcset(group, base_dir))
        ));
    }

    let preferred = groups
        .iter()
        .find(|(format, _)| *format == PREFERRED_IMAGE_FORMAT)
        .or_else(|| groups.first());
    if let Some((_, group)) = preferred {
        let fallback = group
            .last()
            .map(|v| relative(&v.path, base_dir))
            .unwrap_or_default();
        let alt = asset
            .original_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        lines.push(format!(
            "  <img src=\"{}\" srcset=\"{}\" loading=\"lazy\" alt=\"{}\">",
            escape(&fallback),
            escape(&srcset(group, base_dir)),
            escape(&alt)
        ));
    }
    lines.push("</picture>".to_string());
    lines
}

fn video_element(videos: &[&VariantResult], base_dir: &Path) -> Vec<String> {
    let mut lines = vec!["<video controls muted preload=\"metadata\">".to_string()];
    for variant in videos {
        lines.push(format!(
            "  <source src=\"{}\" type=\"video/{}\">",
            escape(&relative(&variant.path, base_dir)),
            variant.format
        ));
    }
    lines.push("  Your browser does not support the video tag.".to_string());
    lines.push("</video>".to_string());
    lines
}

fn srcset(group: &[&VariantResult], base_dir: &Path) -> String {
    group
        .iter()
        .map(|v| match v.width {
            Some(width) => format!("{} {}w", relative(&v.path, base_dir), width),
            None => format!("{} 1x", relative(&v.path, base_dir)),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn image_mime(format: &str) -> String {
    match format {
        "jpg" => "image/jpeg".to_string(),
        "svg" => "image/svg+xml".to_string(),
        other => format!("image/{}", other),
    }
}

fn relative(path: &Path, base_dir: &Path) -> String {
    let path = if base_dir.as_os_str().is_empty() {
        path
    } else {
        path.strip_prefix(base_dir).unwrap_or(path)
    };
    path.to_string_lossy().replace('\\', "/")
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn variant(path: &str, format: &str, width: Option<u32>) -> VariantResult {
        VariantResult {
            path: PathBuf::from(path),
            format: format.to_string(),
            width,
            size: 1,
        }
    }

    fn report() -> AggregateReport {
        let mut image = AssetReport::new("/in/img/hero.jpg", 100);
        image.variants = vec![
            variant("/out/img/hero.avif", "avif", None),
            variant("/out/img/hero.webp", "webp", None),
            variant("/out/img/hero.w640.avif", "avif", Some(640)),
            variant("/out/img/hero.w320.webp", "webp", Some(320)),
            variant("/out/img/hero.w640.webp", "webp", Some(640)),
        ];
        let mut video = AssetReport::new("/in/intro.mov", 100);
        video.variants = vec![variant("/out/intro-webm.webm", "webm", None)];
        let empty = AssetReport::new("/in/skip.png", 100);

        AggregateReport::aggregate("/in", "/out", vec![image, video, empty])
    }

    #[test]
    fn test_picture_groups_formats_and_sorts_widths() {
        let html = render_html(&report(), Path::new("/out"));

        assert!(html.contains(
            "  <source type=\"image/avif\" srcset=\"img/hero.w640.avif 640w, img/hero.avif 1x\">"
        ));
        assert!(html.contains(
            "  <source type=\"image/webp\" srcset=\"img/hero.w320.webp 320w, img/hero.w640.webp 640w, img/hero.webp 1x\">"
        ));
        // avif seen first, so its source comes first
        assert!(html.find("image/avif").unwrap() < html.find("image/webp").unwrap());
        assert!(html.contains("<img src=\"img/hero.webp\" srcset=\"img/hero.w320.webp 320w"));
        assert!(html.contains("loading=\"lazy\" alt=\"hero\""));
    }

    #[test]
    fn test_video_sources_and_skipped_assets() {
        let html = render_html(&report(), Path::new("/out"));
        assert!(html.contains("<source src=\"intro-webm.webm\" type=\"video/webm\">"));
        assert!(!html.contains("skip"));
        assert_eq!(html.matches("<hr>").count(), 2);
        assert!(html.starts_with("<!doctype html>"));
        assert!(html.ends_with("</body></html>"));
    }

    #[test]
    fn test_paths_outside_base_stay_absolute() {
        let html = render_html(&report(), Path::new("/elsewhere"));
        assert!(html.contains("/out/intro-webm.webm"));
    }

    #[test]
    fn test_escape_attribute_values() {
        assert_eq!(escape("a\"b&c"), "a&quot;b&amp;c");
        assert_eq!(image_mime("jpg"), "image/jpeg");
    }

    #[tokio::test]
    async fn test_write_snippets_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site/snippets.html");
        write_snippets(&report(), &path).await.unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("<picture>"));
    }
}
