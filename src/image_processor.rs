//! # Image Processing Module
//!
//! Questo modulo pianifica e genera le varianti responsive di una singola immagine.
//!
//! ## Responsabilità:
//! - Enumera il prodotto cartesiano larghezze × formati
//! - Pilota la catena di encoder per ogni candidata
//! - Applica il filtro "solo se più piccola dell'originale"
//! - In dry-run calcola solo i path di destinazione
//!
//! ## Ordine delle varianti:
//! 1. Full-size (nessun resize) per ogni formato
//! 2. Larghezze richieste in ordine crescente, senza duplicati
//!
//! Per ogni larghezza i formati seguono l'ordine della configurazione.
//!
//! ## Naming:
//! ```text
//! img/hero.jpg  ->  img/hero.webp        (full-size)
//!                   img/hero.w320.webp
//!                   img/hero.w320.avif
//! ```
//!
//! ## Politica dimensioni:
//! Ogni variante è confrontata con l'originale, mai con le altre varianti.
//! Una variante non più piccola viene cancellata dal disco e scartata,
//! a meno di `keep_larger`.
//!
//! ## Esempio:
//! ```rust,ignore
//! let planner = ImageVariantPlanner::new(&config, EncoderChain::for_images(&caps, &config));
//! let report = planner.plan(&asset, &paths).await;
//! ```

use crate::config::Config;
use crate::encoder::{EncodeOutcome, EncoderChain, VariantCandidate};
use crate::file_manager::{Asset, FileManager};
use crate::optimizer::PathResolver;
use crate::report::{improves_on, AssetReport, VariantResult};
use tracing::{debug, warn};

/// Generates the width × format variants of one image
pub struct ImageVariantPlanner {
    formats: Vec<String>,
    /// Full size first, then ascending widths
    widths: Vec<Option<u32>>,
    keep_larger: bool,
    dry_run: bool,
    encoders: EncoderChain,
}

impl ImageVariantPlanner {
    pub fn new(config: &Config, encoders: EncoderChain) -> Self {
        Self {
            formats: config.image_formats.clone(),
            widths: Self::width_plan(&config.widths),
            keep_larger: config.keep_larger,
            dry_run: config.dry_run,
            encoders,
        }
    }

    /// Full size, then the requested widths ascending and deduplicated
    pub fn width_plan(widths: &[u32]) -> Vec<Option<u32>> {
        let mut sized = widths.to_vec();
        sized.sort_unstable();
        sized.dedup();

        std::iter::once(None).chain(sized.into_iter().map(Some)).collect()
    }

    /// Every (width, format) candidate in generation order
    pub fn candidates(&self) -> Vec<VariantCandidate> {
        self.widths
            .iter()
            .flat_map(|&width| {
                self.formats
                    .iter()
                    .map(move |format| VariantCandidate::image(format.as_str(), width))
            })
            .collect()
    }

    /// Produce the surviving variants of `asset`.
    ///
    /// Never fails: encoder errors become missing variants.
    pub async fn plan(&self, asset: &Asset, paths: &PathResolver) -> AssetReport {
        let mut report = AssetReport::new(&asset.path, asset.size);

        for candidate in self.candidates() {
            let suffix = PathResolver::width_suffix(candidate.width());
            let destination = paths.output_path(&asset.path, &suffix, &format!(".{}", candidate.format));

            if destination == asset.path {
                warn!("Skipping {}: variant would overwrite the source", destination.display());
                continue;
            }

            if self.dry_run {
                if self.encoders.can_encode(&candidate) {
                    report.planned_paths.push(destination);
                }
                continue;
            }

            match self.encoders.encode(&asset.path, &destination, &candidate).await {
                EncodeOutcome::Encoded { size } if improves_on(asset.size, size, self.keep_larger) => {
                    debug!(
                        "✅ {} ({}, -{:.1}%)",
                        destination.display(),
                        FileManager::format_size(size),
                        FileManager::calculate_reduction(asset.size, size)
                    );
                    report.variants.push(VariantResult {
                        path: destination,
                        width: candidate.width(),
                        format: candidate.format,
                        size,
                    });
                }
                EncodeOutcome::Encoded { size } => {
                    debug!(
                        "Discarding {}: {} is not smaller than the original {}",
                        destination.display(),
                        FileManager::format_size(size),
                        FileManager::format_size(asset.size)
                    );
                    FileManager::remove_if_exists(&destination).await;
                }
                EncodeOutcome::Failed => {
                    warn!("Could not encode {}", destination.display());
                }
                EncodeOutcome::Unavailable => {
                    debug!("No encoder for {} variants, skipping", candidate.format);
                }
            }
        }

        report
    }
}
