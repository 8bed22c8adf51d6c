//! # Video Processing Module
//!
//! Questo modulo genera una sola variante video per asset tramite una ricerca
//! iterativa sul CRF e una politica di eliminazione tra preset.
//!
//! ## Responsabilità:
//! - Per ogni preset `(suffix, container)` prova CRF crescenti (default 28, 30, 32, 34)
//! - Il primo tentativo più piccolo dell'originale viene promosso al path canonico
//! - Un preset successivo promosso sostituisce quello precedente (file cancellato)
//! - Un preset successivo fallito o esaurito non tocca la variante già tenuta
//! - I file temporanei `_crf<N>` vengono sempre rimossi da chi li ha creati
//!
//! ## Controllo qualità (CRF):
//! - 0-17: Visualmente lossless (file grandi)
//! - 18-23: Alta qualità
//! - 24-28: Buona qualità (punto di partenza, bilanciato)
//! - 29-35: Qualità accettabile (file piccoli)
//!
//! ## Naming:
//! ```text
//! clips/intro.mov  ->  clips/intro-mp4_crf28.mp4   (temporaneo)
//!                      clips/intro-mp4.mp4         (canonico)
//! ```
//!
//! ## Macchina a stati di eliminazione:
//! ```text
//! Vacant --Promoted(r)--> Holding(r)
//! Holding(a) --Promoted(b)--> Holding(b)   (a evicted)
//! Holding(a) --Exhausted|Failed|Unavailable--> Holding(a)
//! ```
//!
//! ## Esempio:
//! ```rust,ignore
//! let planner = VideoQualitySearch::new(&config, EncoderChain::for_videos(&caps, &config));
//! let report = planner.plan(&asset, &paths).await;
//! ```

use crate::config::{Config, QualitySearch, VideoPreset};
use crate::encoder::{EncodeOutcome, EncoderChain, VariantCandidate};
use crate::file_manager::{Asset, FileManager};
use crate::optimizer::PathResolver;
use crate::report::{improves_on, AssetReport, VariantResult};
use std::path::Path;
use tracing::{debug, info, warn};

/// How one preset's search ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetOutcome {
    /// A step beat the original and now lives at the canonical path
    Promoted(VariantResult),
    /// Every step produced a file, none beat the original
    Exhausted,
    /// A step failed or timed out, or the promotion could not happen
    Failed,
    /// No encoder handles the container
    Unavailable,
}

/// Cross-preset elimination: only the latest promoted result survives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Elimination {
    #[default]
    Vacant,
    Holding(VariantResult),
}

impl Elimination {
    /// Fold one preset outcome in; returns the result whose file must be deleted
    pub fn advance(&mut self, outcome: PresetOutcome) -> Option<VariantResult> {
        match outcome {
            PresetOutcome::Promoted(result) => match std::mem::replace(self, Elimination::Holding(result)) {
                Elimination::Holding(previous) if !self.holds_path(&previous.path) => Some(previous),
                _ => None,
            },
            PresetOutcome::Exhausted | PresetOutcome::Failed | PresetOutcome::Unavailable => None,
        }
    }

    fn holds_path(&self, path: &Path) -> bool {
        matches!(self, Elimination::Holding(held) if held.path == path)
    }

    pub fn into_result(self) -> Option<VariantResult> {
        match self {
            Elimination::Vacant => None,
            Elimination::Holding(result) => Some(result),
        }
    }
}

/// Bounded CRF search across the configured presets
pub struct VideoQualitySearch {
    presets: Vec<VideoPreset>,
    search: QualitySearch,
    keep_larger: bool,
    dry_run: bool,
    encoders: EncoderChain,
}

impl VideoQualitySearch {
    pub fn new(config: &Config, encoders: EncoderChain) -> Self {
        Self {
            presets: config.video_presets.clone(),
            search: config.quality_search,
            keep_larger: config.keep_larger,
            dry_run: config.dry_run,
            encoders,
        }
    }

    /// Produce at most one surviving variant for `asset`.
    ///
    /// Never fails: a video nobody can encode yields an empty report.
    pub async fn plan(&self, asset: &Asset, paths: &PathResolver) -> AssetReport {
        let mut report = AssetReport::new(&asset.path, asset.size);
        let mut elimination = Elimination::Vacant;

        for preset in &self.presets {
            if self.dry_run {
                if self.is_encodable(preset) {
                    report
                        .planned_paths
                        .push(paths.output_path(&asset.path, &preset.suffix, &preset.extension));
                }
                continue;
            }

            let outcome = self.search_preset(asset, preset, paths).await;
            debug!("Preset {} for {}: {:?}", preset.suffix, asset.path.display(), outcome);

            if let Some(evicted) = elimination.advance(outcome) {
                debug!("🗑️ {} superseded by preset {}", evicted.path.display(), preset.suffix);
                FileManager::remove_if_exists(&evicted.path).await;
            }
        }

        if let Some(result) = elimination.into_result() {
            info!(
                "🎬 {} -> {} ({})",
                asset.path.display(),
                result.path.display(),
                FileManager::format_size(result.size)
            );
            report.variants.push(result);
        }
        report
    }

    fn is_encodable(&self, preset: &VideoPreset) -> bool {
        self.encoders
            .can_encode(&VariantCandidate::video(preset, self.search.start))
    }

    /// Try increasing CRF values until one beats the original
    async fn search_preset(&self, asset: &Asset, preset: &VideoPreset, paths: &PathResolver) -> PresetOutcome {
        if !self.is_encodable(preset) {
            debug!("No encoder for {}, skipping preset {}", preset.extension, preset.suffix);
            return PresetOutcome::Unavailable;
        }

        let canonical = paths.output_path(&asset.path, &preset.suffix, &preset.extension);

        for crf in self.search.steps() {
            let candidate = VariantCandidate::video(preset, crf);
            let step_path = paths.output_path(
                &asset.path,
                &format!("{}_crf{}", preset.suffix, crf),
                &preset.extension,
            );

            let size = match self.encoders.encode(&asset.path, &step_path, &candidate).await {
                EncodeOutcome::Encoded { size } => size,
                EncodeOutcome::Failed | EncodeOutcome::Unavailable => {
                    warn!(
                        "Encoding {} at CRF {} failed, abandoning preset {}",
                        asset.path.display(),
                        crf,
                        preset.suffix
                    );
                    return PresetOutcome::Failed;
                }
            };

            if !improves_on(asset.size, size, self.keep_larger) {
                debug!(
                    "CRF {} gave {} for {} (original {}), trying next step",
                    crf,
                    FileManager::format_size(size),
                    asset.path.display(),
                    FileManager::format_size(asset.size)
                );
                FileManager::remove_if_exists(&step_path).await;
                continue;
            }

            if let Err(e) = tokio::fs::rename(&step_path, &canonical).await {
                warn!(
                    "Failed to promote {} to {}: {}",
                    step_path.display(),
                    canonical.display(),
                    e
                );
                FileManager::remove_if_exists(&step_path).await;
                return PresetOutcome::Failed;
            }

            return PresetOutcome::Promoted(VariantResult {
                path: canonical,
                format: preset.format(),
                width: None,
                size,
            });
        }

        debug!("Preset {} exhausted for {}", preset.suffix, asset.path.display());
        PresetOutcome::Exhausted
    }
}
