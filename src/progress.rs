//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking dei job per-asset.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` per feedback real-time
//! - Contatori dei job completati, con varianti, senza varianti e falliti
//! - Riepilogo testuale mostrato alla chiusura della barra
//!
//! Il progresso è puramente osservativo: non influenza mai lo scheduling.
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] [=========================>--------------] 98/150 (65%) ✅ hero.jpg: 4 variants
//! ```

use crate::report::AssetReport;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Progress bar over the asset jobs of a run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
    stats: Arc<Mutex<JobStats>>,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_assets: u64) -> Self {
        let bar = ProgressBar::new(total_assets);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self::with_bar(bar)
    }

    /// Same bookkeeping, nothing drawn
    pub fn hidden(total_assets: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total_assets);
        Self::with_bar(bar)
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            stats: Arc::new(Mutex::new(JobStats::default())),
        }
    }

    /// Record a finished job
    pub fn record_report(&self, report: &AssetReport) {
        let name = report
            .original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Ok(mut stats) = self.stats.lock() {
            stats.add_report(report);
        }
        let message = match report.variants.len() {
            0 => format!("⏭️ {}: no variants", name),
            n => format!("✅ {}: {} variants", name, n),
        };
        self.update(&message);
    }

    /// Record a job that errored or panicked
    pub fn record_failure(&self, name: &str) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.add_failure();
        }
        self.update(&format!("❌ {}", name));
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    pub fn stats(&self) -> JobStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Finish with the job summary
    pub fn finish(&self) {
        self.bar.finish_with_message(self.stats().format_summary());
    }
}

/// Counters over finished jobs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStats {
    pub assets_processed: usize,
    pub assets_with_variants: usize,
    pub assets_without_variants: usize,
    pub variants: usize,
    pub failed_jobs: usize,
}

impl JobStats {
    pub fn add_report(&mut self, report: &AssetReport) {
        self.assets_processed += 1;
        self.variants += report.variants.len();
        if report.variants.is_empty() {
            self.assets_without_variants += 1;
        } else {
            self.assets_with_variants += 1;
        }
    }

    pub fn add_failure(&mut self) {
        self.assets_processed += 1;
        self.failed_jobs += 1;
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} assets | With variants: {} | Without: {} | Variants: {} | Failed: {}",
            self.assets_processed,
            self.assets_with_variants,
            self.assets_without_variants,
            self.variants,
            self.failed_jobs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::VariantResult;

    #[test]
    fn test_stats_follow_reports() {
        let progress = ProgressManager::hidden(3);

        let mut with = AssetReport::new("/in/a.jpg", 100);
        with.variants.push(VariantResult {
            path: "/out/a.webp".into(),
            format: "webp".into(),
            width: None,
            size: 50,
        });
        progress.record_report(&with);
        progress.record_report(&AssetReport::new("/in/b.mp4", 100));
        progress.record_failure("c.png");
        progress.finish();

        let stats = progress.stats();
        assert_eq!(stats.assets_processed, 3);
        assert_eq!(stats.assets_with_variants, 1);
        assert_eq!(stats.assets_without_variants, 1);
        assert_eq!(stats.variants, 1);
        assert_eq!(stats.failed_jobs, 1);
        assert!(stats.format_summary().contains("Failed: 1"));
    }

    #[test]
    fn test_hidden_bar_tracks_length_and_position() {
        let progress = ProgressManager::hidden(2);
        assert_eq!(progress.bar.length(), Some(2));

        progress.record_failure("a.jpg");
        assert_eq!(progress.bar.position(), 1);
        assert_eq!(progress.stats().failed_jobs, 1);
    }
}
