//! # Task Optimizer Module
//!
//! Worker per l'elaborazione di un singolo asset.
//! Separato dall'orchestratore principale per maggiore modularità:
//! sceglie il planner giusto (immagine o video) e restituisce l'`AssetReport`.

use crate::{
    config::Config,
    encoder::EncoderChain,
    error::OptimizeError,
    file_manager::{Asset, FileManager, MediaKind},
    image_processor::ImageVariantPlanner,
    optimizer::path_resolver::PathResolver,
    report::AssetReport,
    video_processor::VideoQualitySearch,
};
use tracing::debug;

/// Per-asset worker shared by every job of a run
pub struct TaskOptimizer {
    images: ImageVariantPlanner,
    videos: VideoQualitySearch,
    paths: PathResolver,
}

impl TaskOptimizer {
    pub fn new(config: &Config, image_encoders: EncoderChain, video_encoders: EncoderChain, paths: PathResolver) -> Self {
        Self {
            images: ImageVariantPlanner::new(config, image_encoders),
            videos: VideoQualitySearch::new(config, video_encoders),
            paths,
        }
    }

    /// Run the planner matching the asset's kind
    pub async fn process(&self, asset: &Asset) -> Result<AssetReport, OptimizeError> {
        if FileManager::file_size(&asset.path).await.is_none() {
            return Err(OptimizeError::Job {
                path: asset.path.clone(),
                message: "source disappeared after discovery".to_string(),
            });
        }

        debug!("Processing {:?} {}", asset.kind, asset.path.display());
        let report = match asset.kind {
            MediaKind::Image => self.images.plan(asset, &self.paths).await,
            MediaKind::Video => self.videos.plan(asset, &self.paths).await,
        };
        Ok(report)
    }
}
