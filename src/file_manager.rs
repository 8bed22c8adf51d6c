//! # File Management Module
//!
//! Questo modulo gestisce la discovery degli asset e le utilità sui file.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di immagini e video in una directory
//! - Classificazione del tipo di asset (immagine vs video) per estensione
//! - Utilità per dimensioni human-readable e percentuali di riduzione
//! - Rimozione "best effort" di file intermedi
//!
//! ## Formati supportati:
//! - **Immagini**: JPG, JPEG, PNG, GIF, BMP, TIFF, WebP
//! - **Video**: MP4, MOV, AVI, MKV, WebM, FLV

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "flv"];

/// Kind of a discovered asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// A source file discovered under the input root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub path: PathBuf,
    pub size: u64,
    pub kind: MediaKind,
}

/// Manages asset discovery and file utilities
pub struct FileManager;

impl FileManager {
    /// Find every image and video under `root`, with absolute paths and sizes
    pub fn find_assets(root: &Path) -> Result<Vec<Asset>> {
        let root = root
            .canonicalize()
            .map_err(|e| anyhow::anyhow!("Failed to canonicalize {}: {}", root.display(), e))?;
        let mut assets = Vec::new();

        for entry in WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let Some(kind) = Self::media_kind(path) else {
                continue;
            };

            match entry.metadata() {
                Ok(metadata) => assets.push(Asset {
                    path: path.to_path_buf(),
                    size: metadata.len(),
                    kind,
                }),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        debug!("Discovered {} assets under {}", assets.len(), root.display());
        Ok(assets)
    }

    /// Classify a path by extension (case-insensitive)
    pub fn media_kind(path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Check if a file is a video
    pub fn is_video(path: &Path) -> bool {
        Self::media_kind(path) == Some(MediaKind::Video)
    }

    /// Size of a file, or None if it does not exist
    pub async fn file_size(path: &Path) -> Option<u64> {
        fs::metadata(path).await.ok().filter(|m| m.is_file()).map(|m| m.len())
    }

    /// Delete a file if present; failures are logged, never raised
    pub async fn remove_if_exists(path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Same as [`format_size`](Self::format_size) but keeps the sign of a delta
    pub fn format_signed_size(delta: i64) -> String {
        if delta < 0 {
            format!("-{}", Self::format_size(delta.unsigned_abs()))
        } else {
            Self::format_size(delta as u64)
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_media_kind_by_extension() {
        assert_eq!(FileManager::media_kind(Path::new("a/photo.JPG")), Some(MediaKind::Image));
        assert_eq!(FileManager::media_kind(Path::new("scan.tiff")), Some(MediaKind::Image));
        assert_eq!(FileManager::media_kind(Path::new("clip.flv")), Some(MediaKind::Video));
        assert_eq!(FileManager::media_kind(Path::new("notes.txt")), None);
        assert_eq!(FileManager::media_kind(Path::new("Makefile")), None);
        assert!(FileManager::is_video(Path::new("x.MKV")));
    }

    #[test]
    fn test_find_assets_recurses_and_classifies() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("img/nested")).unwrap();
        std::fs::write(dir.path().join("img/a.png"), vec![0u8; 10]).unwrap();
        std::fs::write(dir.path().join("img/nested/b.jpeg"), vec![0u8; 20]).unwrap();
        std::fs::write(dir.path().join("intro.mp4"), vec![0u8; 30]).unwrap();
        std::fs::write(dir.path().join("readme.md"), b"skip").unwrap();

        let assets = FileManager::find_assets(dir.path()).unwrap();
        assert_eq!(assets.len(), 3);

        let videos: Vec<_> = assets.iter().filter(|a| a.kind == MediaKind::Video).collect();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].size, 30);
        assert!(assets.iter().all(|a| a.path.is_absolute()));
    }

    #[test]
    fn test_find_assets_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(FileManager::find_assets(&dir.path().join("nope")).is_err());
    }

    #[tokio::test]
    async fn test_remove_if_exists_tolerates_missing_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("partial.webm");
        std::fs::write(&file, b"half").unwrap();

        FileManager::remove_if_exists(&file).await;
        assert!(!file.exists());
        FileManager::remove_if_exists(&file).await;
        assert_eq!(FileManager::file_size(&file).await, None);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(2048), "2.00 KB");
        assert_eq!(FileManager::format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(FileManager::format_signed_size(-2048), "-2.00 KB");
    }

    #[test]
    fn test_calculate_reduction() {
        assert_eq!(FileManager::calculate_reduction(0, 10), 0.0);
        assert_eq!(FileManager::calculate_reduction(200, 50), 75.0);
        assert!(FileManager::calculate_reduction(100, 150) < 0.0);
    }
}
