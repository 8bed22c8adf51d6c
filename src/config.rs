//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione della pipeline.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di generazione varianti
//! - Fornisce validazione dei parametri prima di schedulare qualsiasi job
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Parsing delle liste csv della command line (formati, larghezze, preset video)
//!
//! ## Parametri di configurazione:
//! - `output_path`: Directory di output (default: None = `<input>_optimized`)
//! - `image_formats`: Formati immagine da generare (default: webp, avif)
//! - `widths`: Larghezze responsive (default: 320, 640, 1280)
//! - `video_presets`: Coppie suffix/container (default: `-mp4:.mp4`, `-webm:.webm`)
//! - `quality_search`: CRF iniziale, passo e limite (default: 28, +2, 35)
//! - `workers`: Numero di job paralleli (default: 4)
//! - `dry_run`: Calcola solo i path di destinazione
//! - `keep_larger`: Disabilita il filtro "solo se più piccolo"
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     widths: vec![480, 960],
//!     workers: 8,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A named video target: the suffix appended to the file stem and the container extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPreset {
    pub suffix: String,
    /// Container extension, always with a leading dot (".mp4")
    pub extension: String,
}

impl VideoPreset {
    pub fn new(suffix: impl Into<String>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        let extension = if extension.starts_with('.') {
            extension
        } else {
            format!(".{}", extension)
        };
        Self {
            suffix: suffix.into(),
            extension,
        }
    }

    /// Container name as reported in variant results ("mp4", "webm")
    pub fn format(&self) -> String {
        self.extension.trim_start_matches('.').to_lowercase()
    }
}

/// Bounded CRF search range for video attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySearch {
    pub start: u8,
    pub step: u8,
    pub max: u8,
}

impl Default for QualitySearch {
    fn default() -> Self {
        Self {
            start: 28,
            step: 2,
            max: 35,
        }
    }
}

impl QualitySearch {
    /// CRF values to try, from the most lenient to the most aggressive
    pub fn steps(&self) -> Vec<u8> {
        if self.step == 0 {
            return vec![self.start];
        }
        (self.start..=self.max).step_by(self.step as usize).collect()
    }
}

/// Configuration for asset variant generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output root (None = sibling of the input suffixed `_optimized`)
    pub output_path: Option<PathBuf>,
    /// Image formats to generate, lowercase extensions without dot
    pub image_formats: Vec<String>,
    /// Responsive widths; the full-size variant is always implied
    pub widths: Vec<u32>,
    /// Video presets, tried in order; later presets are preferred
    pub video_presets: Vec<VideoPreset>,
    /// CRF search range for video
    pub quality_search: QualitySearch,
    /// Number of concurrent asset jobs
    pub workers: usize,
    /// Only compute destination paths
    pub dry_run: bool,
    /// Keep variants even when they are not smaller than the source
    pub keep_larger: bool,
    /// WebP quality for ffmpeg (1-100)
    pub webp_quality: u8,
    /// AVIF CRF for ffmpeg (0-63)
    pub avif_crf: u8,
    /// x264 speed preset for mp4 attempts
    pub video_speed: String,
    /// Audio bitrate for mp4 attempts
    pub audio_bitrate: String,
    /// Deadline of a single video attempt, in seconds
    pub video_timeout_secs: u64,
    /// Deadline of a single image attempt, in seconds
    pub image_timeout_secs: u64,
    /// Grace window between SIGTERM and SIGKILL, in milliseconds
    pub kill_grace_ms: u64,
    /// Explicit ffmpeg binary, bypassing PATH lookup
    pub ffmpeg_path: Option<PathBuf>,
    /// Draw the progress bar
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: None,
            image_formats: vec!["webp".to_string(), "avif".to_string()],
            widths: vec![320, 640, 1280],
            video_presets: vec![
                VideoPreset::new("-mp4", ".mp4"),
                VideoPreset::new("-webm", ".webm"),
            ],
            quality_search: QualitySearch::default(),
            workers: 4,
            dry_run: false,
            keep_larger: false,
            webp_quality: 80,
            avif_crf: 30,
            video_speed: "medium".to_string(),
            audio_bitrate: "128k".to_string(),
            video_timeout_secs: 120,
            image_timeout_secs: 120,
            kill_grace_ms: 3000,
            ffmpeg_path: None,
            show_progress: true,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.image_formats.is_empty() && self.video_presets.is_empty() {
            return Err(anyhow::anyhow!("At least one image format or video preset is required"));
        }

        if self.image_formats.iter().any(|f| f.trim().is_empty()) {
            return Err(anyhow::anyhow!("Image formats must not be empty"));
        }

        if self.widths.iter().any(|&w| w == 0) {
            return Err(anyhow::anyhow!("Responsive widths must be greater than 0"));
        }

        if self.webp_quality == 0 || self.webp_quality > 100 {
            return Err(anyhow::anyhow!("WebP quality must be between 1 and 100"));
        }

        if self.avif_crf > 63 {
            return Err(anyhow::anyhow!("AVIF CRF must be between 0 and 63"));
        }

        let search = &self.quality_search;
        if search.step == 0 {
            return Err(anyhow::anyhow!("CRF step must be greater than 0"));
        }
        if search.start > search.max {
            return Err(anyhow::anyhow!(
                "CRF start ({}) must not exceed CRF cap ({})",
                search.start,
                search.max
            ));
        }
        if search.max > 63 {
            return Err(anyhow::anyhow!("CRF cap must be at most 63"));
        }

        if self.video_timeout_secs == 0 || self.image_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Encode timeouts must be greater than 0"));
        }

        if let Some(ref ffmpeg) = self.ffmpeg_path {
            if !ffmpeg.exists() {
                return Err(anyhow::anyhow!("ffmpeg binary does not exist: {}", ffmpeg.display()));
            }
        }

        Ok(())
    }

    /// Resolve the output root for a given input directory
    pub fn output_dir_for(&self, input_dir: &Path) -> PathBuf {
        match self.output_path {
            Some(ref dir) => dir.clone(),
            None => {
                let name = input_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "assets".to_string());
                input_dir
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(format!("{}_optimized", name))
            }
        }
    }

    pub fn video_timeout(&self) -> Duration {
        Duration::from_secs(self.video_timeout_secs)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    /// Load configuration from file
    pub async fn from_file(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Parse a csv list of formats ("webp, AVIF" -> ["webp", "avif"])
pub fn parse_formats(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|f| f.trim().trim_start_matches('.').to_lowercase())
        .filter(|f| !f.is_empty())
        .collect()
}

/// Parse a csv list of widths
pub fn parse_widths(csv: &str) -> Result<Vec<u32>> {
    csv.split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(|w| {
            w.parse::<u32>()
                .map_err(|e| anyhow::anyhow!("Invalid width '{}': {}", w, e))
        })
        .collect()
}

/// Parse `suffix:extension` pairs; parts without a colon are ignored
pub fn parse_video_presets(csv: &str) -> Vec<VideoPreset> {
    csv.split(',')
        .filter_map(|part| part.split_once(':'))
        .map(|(suffix, ext)| VideoPreset::new(suffix.trim(), ext.trim()))
        .filter(|p| p.extension.len() > 1)
        .collect()
}
