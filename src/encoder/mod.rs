//! # Variant Encoder Adapter
//!
//! Questo modulo trasforma una `VariantCandidate` in un file su disco.
//!
//! ## Architettura a catena di provider:
//! Ogni provider espone lo stesso contratto (`supports` + `attempt`) e la
//! catena li prova in ordine di priorità:
//! 1. **ffmpeg** (`FfmpegEncoder`): tutti i formati immagine e tutto il video
//! 2. **image crate** (`ImageLibraryEncoder`): solo WebP statico, come fallback
//!
//! ## Garanzie:
//! - La directory di destinazione viene creata prima di scrivere (idempotente)
//! - Un fallimento non solleva mai errori: diventa `EncodeOutcome::Failed`
//! - Output mancanti o vuoti vengono rimossi e trattati come fallimento
//! - Il fallback viene provato solo per i formati che dichiara di supportare

pub mod ffmpeg;
pub mod image_library;

pub use ffmpeg::FfmpegEncoder;
pub use image_library::ImageLibraryEncoder;

use crate::config::{Config, VideoPreset};
use crate::error::OptimizeError;
use crate::file_manager::FileManager;
use crate::tool_resolver::Capabilities;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a candidate asks the encoder to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateKind {
    /// Still image, optionally downscaled to `width` (None = full size)
    Image { width: Option<u32> },
    /// Video in the preset's container at the given CRF
    Video { preset: VideoPreset, crf: u8 },
}

/// A requested transformation of one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCandidate {
    /// Target format, lowercase without dot ("webp", "avif", "mp4")
    pub format: String,
    pub kind: CandidateKind,
}

impl VariantCandidate {
    pub fn image(format: impl Into<String>, width: Option<u32>) -> Self {
        Self {
            format: format.into().to_lowercase(),
            kind: CandidateKind::Image { width },
        }
    }

    pub fn video(preset: &VideoPreset, crf: u8) -> Self {
        Self {
            format: preset.format(),
            kind: CandidateKind::Video {
                preset: preset.clone(),
                crf,
            },
        }
    }

    pub fn width(&self) -> Option<u32> {
        match self.kind {
            CandidateKind::Image { width } => width,
            CandidateKind::Video { .. } => None,
        }
    }
}

/// One way of producing a variant
#[async_trait]
pub trait EncoderProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this provider can produce the candidate at all
    fn supports(&self, candidate: &VariantCandidate) -> bool;

    /// Write `destination` from `source`. May leave a partial file on failure.
    async fn attempt(
        &self,
        source: &Path,
        destination: &Path,
        candidate: &VariantCandidate,
    ) -> Result<(), OptimizeError>;
}

/// Result of [`EncoderChain::encode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeOutcome {
    /// Exactly one file was written, with this size in bytes
    Encoded { size: u64 },
    /// Every supporting provider failed
    Failed,
    /// No provider supports the candidate
    Unavailable,
}

/// Ordered list of providers, tried by priority
#[derive(Clone, Default)]
pub struct EncoderChain {
    providers: Vec<Arc<dyn EncoderProvider>>,
}

impl EncoderChain {
    pub fn new(providers: Vec<Arc<dyn EncoderProvider>>) -> Self {
        Self { providers }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Chain for still images: ffmpeg first, image library for WebP
    pub fn for_images(capabilities: &Capabilities, config: &Config) -> Self {
        let mut providers: Vec<Arc<dyn EncoderProvider>> = Vec::new();
        if let Some(ref ffmpeg) = capabilities.ffmpeg {
            providers.push(Arc::new(FfmpegEncoder::new(ffmpeg.clone(), config)));
        }
        if capabilities.image_library {
            providers.push(Arc::new(ImageLibraryEncoder));
        }
        Self::new(providers)
    }

    /// Chain for video: ffmpeg only
    pub fn for_videos(capabilities: &Capabilities, config: &Config) -> Self {
        match capabilities.ffmpeg {
            Some(ref ffmpeg) => {
                let ffmpeg: Arc<dyn EncoderProvider> = Arc::new(FfmpegEncoder::new(ffmpeg.clone(), config));
                Self::new(vec![ffmpeg])
            }
            None => Self::empty(),
        }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Whether any provider supports the candidate
    pub fn can_encode(&self, candidate: &VariantCandidate) -> bool {
        self.providers.iter().any(|p| p.supports(candidate))
    }

    /// Encode one candidate, falling through providers until one succeeds
    pub async fn encode(
        &self,
        source: &Path,
        destination: &Path,
        candidate: &VariantCandidate,
    ) -> EncodeOutcome {
        let supporting: Vec<_> = self.providers.iter().filter(|p| p.supports(candidate)).collect();
        if supporting.is_empty() {
            debug!(
                "{} ({})",
                OptimizeError::CapabilityUnavailable(candidate.format.clone()),
                source.display()
            );
            return EncodeOutcome::Unavailable;
        }

        if let Some(parent) = destination.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!("Failed to create {}: {}", parent.display(), e);
                return EncodeOutcome::Failed;
            }
        }

        for provider in supporting {
            debug!(
                "Attempting {} -> {} with {}",
                source.display(),
                destination.display(),
                provider.name()
            );

            let result = provider.attempt(source, destination, candidate).await;
            let result = match result {
                Ok(()) => match FileManager::file_size(destination).await {
                    Some(size) if size > 0 => Ok(size),
                    _ => Err(OptimizeError::MissingOutput(destination.to_path_buf())),
                },
                Err(e) => Err(e),
            };

            match result {
                Ok(size) => {
                    debug!("{} wrote {} ({} bytes)", provider.name(), destination.display(), size);
                    return EncodeOutcome::Encoded { size };
                }
                Err(e) => {
                    warn!("{} failed for {}: {}, trying next encoder", provider.name(), destination.display(), e);
                    FileManager::remove_if_exists(destination).await;
                }
            }
        }

        EncodeOutcome::Failed
    }
}

/// Test doubles shared by the planner and scheduler tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Writes a file of a scripted size; `None` in the script means "fail"
    pub struct ScriptedEncoder {
        pub name: &'static str,
        pub formats: Vec<String>,
        /// (format, width-or-crf) -> output size
        pub sizes: HashMap<(String, Option<u32>), Option<u64>>,
        pub default_size: Option<u64>,
        pub calls: Mutex<Vec<VariantCandidate>>,
    }

    impl ScriptedEncoder {
        pub fn new(name: &'static str, formats: &[&str]) -> Self {
            Self {
                name,
                formats: formats.iter().map(|f| f.to_string()).collect(),
                sizes: HashMap::new(),
                default_size: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn default_size(mut self, size: Option<u64>) -> Self {
            self.default_size = size;
            self
        }

        /// Script the output for an image width or a video CRF
        pub fn with(mut self, format: &str, key: Option<u32>, size: Option<u64>) -> Self {
            self.sizes.insert((format.to_string(), key), size);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn key(candidate: &VariantCandidate) -> Option<u32> {
            match candidate.kind {
                CandidateKind::Image { width } => width,
                CandidateKind::Video { crf, .. } => Some(crf as u32),
            }
        }
    }

    #[async_trait]
    impl EncoderProvider for ScriptedEncoder {
        fn name(&self) -> &str {
            self.name
        }

        fn supports(&self, candidate: &VariantCandidate) -> bool {
            self.formats.contains(&candidate.format)
        }

        async fn attempt(
            &self,
            _source: &Path,
            destination: &Path,
            candidate: &VariantCandidate,
        ) -> Result<(), OptimizeError> {
            self.calls.lock().unwrap().push(candidate.clone());
            let size = self
                .sizes
                .get(&(candidate.format.clone(), Self::key(candidate)))
                .copied()
                .unwrap_or(self.default_size);

            match size {
                Some(size) => {
                    tokio::fs::write(destination, vec![0u8; size as usize]).await?;
                    Ok(())
                }
                None => {
                    tokio::fs::write(destination, b"partial").await?;
                    Err(OptimizeError::AttemptFailed {
                        tool: self.name.to_string(),
                        status: "exit status: 1".to_string(),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedEncoder;
    use super::*;
    use tempfile::TempDir;

    fn chain(providers: Vec<ScriptedEncoder>) -> EncoderChain {
        EncoderChain::new(
            providers
                .into_iter()
                .map(|p| Arc::new(p) as Arc<dyn EncoderProvider>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_primary_success_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("deep/nested/photo.w320.webp");
        let chain = chain(vec![ScriptedEncoder::new("primary", &["webp"]).default_size(Some(1500))]);

        let outcome = chain
            .encode(Path::new("photo.jpg"), &dest, &VariantCandidate::image("webp", Some(320)))
            .await;
        assert_eq!(outcome, EncodeOutcome::Encoded { size: 1500 });
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn test_fallback_used_after_primary_failure() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("photo.webp");
        let primary = ScriptedEncoder::new("primary", &["webp", "avif"]).default_size(None);
        let fallback = ScriptedEncoder::new("fallback", &["webp"]).default_size(Some(900));
        let chain = chain(vec![primary, fallback]);

        let outcome = chain
            .encode(Path::new("photo.jpg"), &dest, &VariantCandidate::image("webp", None))
            .await;
        assert_eq!(outcome, EncodeOutcome::Encoded { size: 900 });
    }

    #[tokio::test]
    async fn test_fallback_not_tried_for_unsupported_format() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("photo.avif");
        let fallback = Arc::new(ScriptedEncoder::new("fallback", &["webp"]).default_size(Some(900)));
        let chain = EncoderChain::new(vec![
            Arc::new(ScriptedEncoder::new("primary", &["avif"]).default_size(None)) as Arc<dyn EncoderProvider>,
            fallback.clone() as Arc<dyn EncoderProvider>,
        ]);

        let outcome = chain
            .encode(Path::new("photo.jpg"), &dest, &VariantCandidate::image("avif", None))
            .await;
        assert_eq!(outcome, EncodeOutcome::Failed);
        assert_eq!(fallback.call_count(), 0);
        assert!(!dest.exists(), "partial output must be removed");
    }

    #[tokio::test]
    async fn test_zero_byte_output_is_a_failure() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("empty.webp");
        let chain = chain(vec![ScriptedEncoder::new("primary", &["webp"]).default_size(Some(0))]);

        let outcome = chain
            .encode(Path::new("photo.png"), &dest, &VariantCandidate::image("webp", None))
            .await;
        assert_eq!(outcome, EncodeOutcome::Failed);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_no_supporting_provider_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let chain = EncoderChain::empty();
        let candidate = VariantCandidate::video(&VideoPreset::new("-webm", ".webm"), 28);

        assert!(!chain.can_encode(&candidate));
        let outcome = chain
            .encode(Path::new("clip.mp4"), &dir.path().join("clip-webm.webm"), &candidate)
            .await;
        assert_eq!(outcome, EncodeOutcome::Unavailable);
    }

    #[test]
    fn test_chains_follow_capabilities() {
        let config = Config::default();
        let caps = Capabilities {
            ffmpeg: None,
            image_library: true,
        };
        let images = EncoderChain::for_images(&caps, &config);
        assert_eq!(images.provider_names(), vec!["image-library"]);
        assert!(images.can_encode(&VariantCandidate::image("webp", Some(320))));
        assert!(!images.can_encode(&VariantCandidate::image("avif", Some(320))));
        assert!(EncoderChain::for_videos(&caps, &config).provider_names().is_empty());

        let caps = Capabilities {
            ffmpeg: Some("/usr/bin/ffmpeg".into()),
            image_library: true,
        };
        assert_eq!(
            EncoderChain::for_images(&caps, &config).provider_names(),
            vec!["ffmpeg", "image-library"]
        );
        assert_eq!(EncoderChain::for_videos(&caps, &config).provider_names(), vec!["ffmpeg"]);
    }

    #[test]
    fn test_candidate_accessors() {
        let preset = VideoPreset::new("-mp4", "mp4");
        let video = VariantCandidate::video(&preset, 30);
        assert_eq!(video.format, "mp4");
        assert_eq!(video.width(), None);

        let image = VariantCandidate::image("WEBP", Some(640));
        assert_eq!(image.format, "webp");
        assert_eq!(image.width(), Some(640));
    }
}
