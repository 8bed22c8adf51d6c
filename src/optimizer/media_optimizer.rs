//! # Media Optimizer Main Orchestrator
//!
//! Orchestratore principale che delega ai moduli specializzati.
//!
//! ## Flusso di un run:
//! 1. Valida la configurazione e la directory di input (errori fatali)
//! 2. Discovery ricorsiva degli asset
//! 3. Fan-out: un job `tokio::spawn` per asset, limitati da un `Semaphore`
//! 4. Fan-in: join degli handle nell'ordine di dispatch
//! 5. Riduzione dei report in `AggregateReport`
//!
//! Un job che fallisce o va in panic viene loggato ed escluso dall'aggregato;
//! gli altri job proseguono.

use crate::{
    config::Config,
    encoder::EncoderChain,
    error::OptimizeError,
    file_manager::{Asset, FileManager},
    optimizer::{path_resolver::PathResolver, task_optimizer::TaskOptimizer},
    progress::ProgressManager,
    report::{AggregateReport, AssetReport},
    tool_resolver::Capabilities,
};
use anyhow::Result;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Orchestratore principale
pub struct MediaOptimizer {
    config: Config,
    image_encoders: EncoderChain,
    video_encoders: EncoderChain,
}

impl MediaOptimizer {
    /// Validate the configuration and detect encoder capabilities once
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let capabilities = Capabilities::detect(config.ffmpeg_path.as_deref());
        capabilities.log_report();

        let image_encoders = EncoderChain::for_images(&capabilities, &config);
        let video_encoders = EncoderChain::for_videos(&capabilities, &config);
        Ok(Self {
            config,
            image_encoders,
            video_encoders,
        })
    }

    /// Build with explicit encoder chains
    pub fn with_encoders(config: Config, image_encoders: EncoderChain, video_encoders: EncoderChain) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            image_encoders,
            video_encoders,
        })
    }

    /// Esegue il run completo su `input_dir`
    pub async fn run(&self, input_dir: &Path) -> Result<AggregateReport> {
        if !input_dir.is_dir() {
            return Err(OptimizeError::Config(format!(
                "input directory does not exist: {}",
                input_dir.display()
            ))
            .into());
        }
        let input_root = input_dir.canonicalize()?;
        let output_root = Self::absolute(self.config.output_dir_for(&input_root))?;

        info!("Starting asset optimization in: {}", input_root.display());
        self.log_configuration(&output_root);

        let assets: Vec<Asset> = FileManager::find_assets(&input_root)?
            .into_iter()
            .filter(|asset| !asset.path.starts_with(&output_root))
            .collect();
        info!("Found {} assets to process", assets.len());

        let progress = if self.config.show_progress {
            ProgressManager::new(assets.len() as u64)
        } else {
            ProgressManager::hidden(assets.len() as u64)
        };

        let task = Arc::new(TaskOptimizer::new(
            &self.config,
            self.image_encoders.clone(),
            self.video_encoders.clone(),
            PathResolver::new(&input_root, &output_root)
                .with_unique_stems(assets.iter().map(|asset| asset.path.as_path())),
        ));
        let reports = self.process_concurrently(assets, task, progress.clone()).await?;
        progress.finish();

        Ok(AggregateReport::aggregate(input_root, output_root, reports))
    }

    fn log_configuration(&self, output_root: &Path) {
        info!("Output directory: {}", output_root.display());
        info!("Image formats: {}", self.config.image_formats.join(", "));
        info!("Widths: {:?} + full size", self.config.widths);
        let presets: Vec<String> = self
            .config
            .video_presets
            .iter()
            .map(|p| format!("{}{}", p.suffix, p.extension))
            .collect();
        info!("Video presets: {} (CRF {:?})", presets.join(", "), self.config.quality_search.steps());
        info!("Workers: {}", self.config.workers);
        if self.config.dry_run {
            info!("Dry run mode: No files will be written");
        }
        if self.config.keep_larger {
            info!("Keep-larger mode: variants are kept even when not smaller");
        }
    }

    /// Fan-out onto the bounded pool, fan-in in dispatch order
    async fn process_concurrently(
        &self,
        assets: Vec<Asset>,
        task: Arc<TaskOptimizer>,
        progress: ProgressManager,
    ) -> Result<Vec<AssetReport>> {
        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let mut handles: Vec<(PathBuf, JoinHandle<Result<AssetReport, OptimizeError>>)> = Vec::new();

        for asset in assets {
            let permit = semaphore.clone().acquire_owned().await?;
            let task = task.clone();
            let progress = progress.clone();
            let path = asset.path.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = task.process(&asset).await;
                match result {
                    Ok(ref report) => progress.record_report(report),
                    Err(ref e) => {
                        error!("Failed to process {}: {}", asset.path.display(), e);
                        progress.record_failure(&Self::display_name(&asset.path));
                    }
                }
                result
            });
            handles.push((path, handle));
        }

        let (paths, handles): (Vec<PathBuf>, Vec<_>) = handles.into_iter().unzip();
        let results = join_all(handles).await;

        let mut reports = Vec::with_capacity(results.len());
        for (path, result) in paths.into_iter().zip(results) {
            match result {
                Ok(Ok(report)) => reports.push(report),
                // Logged and counted by the job itself
                Ok(Err(_)) => {}
                Err(e) => {
                    error!("Job for {} panicked or was cancelled: {}", path.display(), e);
                    progress.record_failure(&Self::display_name(&path));
                }
            }
        }

        debug!("Collected {} asset reports", reports.len());
        Ok(reports)
    }

    fn display_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }

    fn absolute(path: PathBuf) -> Result<PathBuf> {
        if path.exists() {
            Ok(path.canonicalize()?)
        } else if path.is_absolute() {
            Ok(path)
        } else {
            Ok(std::env::current_dir()?.join(path))
        }
    }
}
