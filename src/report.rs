//! # Report Module
//!
//! Modello dei risultati e riduzione finale in `AggregateReport`.
//!
//! ## Responsabilità:
//! - `VariantResult`: una variante sopravvissuta (path, formato, larghezza, byte)
//! - `AssetReport`: le varianti di un singolo asset, nell'ordine di generazione
//! - `AggregateReport`: totali del run e serializzazione JSON su file
//! - Politica di miglioramento: una variante vale solo se più piccola dell'originale
//!
//! ## Formato JSON:
//! ```json
//! {
//!   "input_dir": "/site/static",
//!   "output_dir": "/site/static_optimized",
//!   "num_assets": 1,
//!   "total_original_bytes": 2000000,
//!   "total_final_bytes": 150000,
//!   "total_saved_bytes": 1850000,
//!   "percent_reduction": 92.5,
//!   "assets": [{ "original_path": "...", "original_size": 2000000,
//!                "variants": [{ "path": "...", "format": "webp", "width": 320, "size": 150000 }] }]
//! }
//! ```

use crate::file_manager::FileManager;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One encoded variant that passed the size policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantResult {
    pub path: PathBuf,
    pub format: String,
    /// Requested width; None for full-size images and for video
    pub width: Option<u32>,
    pub size: u64,
}

/// Outcome of one asset job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetReport {
    pub original_path: PathBuf,
    pub original_size: u64,
    pub variants: Vec<VariantResult>,
    /// Destinations computed in dry-run mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub planned_paths: Vec<PathBuf>,
}

impl AssetReport {
    pub fn new(original_path: impl Into<PathBuf>, original_size: u64) -> Self {
        Self {
            original_path: original_path.into(),
            original_size,
            variants: Vec::new(),
            planned_paths: Vec::new(),
        }
    }

    /// Bytes of every surviving variant
    pub fn final_bytes(&self) -> u64 {
        self.variants.iter().map(|v| v.size).sum()
    }
}

/// Totals over a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub num_assets: usize,
    pub total_original_bytes: u64,
    pub total_final_bytes: u64,
    /// Signed: keeping several variants per asset can exceed the originals
    pub total_saved_bytes: i64,
    pub percent_reduction: f64,
    pub assets: Vec<AssetReport>,
}

impl AggregateReport {
    /// Reduce per-asset reports, keeping them in the order received
    pub fn aggregate(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, assets: Vec<AssetReport>) -> Self {
        let total_original_bytes: u64 = assets.iter().map(|a| a.original_size).sum();
        let total_final_bytes: u64 = assets.iter().map(AssetReport::final_bytes).sum();
        let total_saved_bytes = total_original_bytes as i64 - total_final_bytes as i64;
        let percent_reduction = if total_original_bytes == 0 {
            0.0
        } else {
            total_saved_bytes as f64 / total_original_bytes as f64 * 100.0
        };

        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            num_assets: assets.len(),
            total_original_bytes,
            total_final_bytes,
            total_saved_bytes,
            percent_reduction,
            assets,
        }
    }

    pub fn num_variants(&self) -> usize {
        self.assets.iter().map(|a| a.variants.len()).sum()
    }

    /// Write the report as pretty JSON, creating the parent directory
    pub async fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        debug!("Report written to {}", path.display());
        Ok(())
    }

    /// Log the human-readable summary of the run
    pub fn log_summary(&self) {
        info!("📊 Optimization summary:");
        info!("  Assets processed: {}", self.num_assets);
        info!("  Variants kept: {}", self.num_variants());
        info!("  Original size: {}", FileManager::format_size(self.total_original_bytes));
        info!("  Variants size: {}", FileManager::format_size(self.total_final_bytes));
        info!(
            "  Saved: {} ({:.1}%)",
            FileManager::format_signed_size(self.total_saved_bytes),
            self.percent_reduction
        );
    }
}

/// Whether a variant of `candidate` bytes is worth keeping against the original
pub fn improves_on(original: u64, candidate: u64, keep_larger: bool) -> bool {
    keep_larger || candidate < original
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn asset(original: u64, variants: &[u64]) -> AssetReport {
        let mut report = AssetReport::new("/in/a.jpg", original);
        report.variants = variants
            .iter()
            .map(|&size| VariantResult {
                path: PathBuf::from("/out/a.webp"),
                format: "webp".to_string(),
                width: None,
                size,
            })
            .collect();
        report
    }

    #[test]
    fn test_aggregate_totals() {
        let report = AggregateReport::aggregate(
            "/in",
            "/out",
            vec![asset(1000, &[200, 100]), asset(500, &[]), asset(500, &[200])],
        );
        assert_eq!(report.num_assets, 3);
        assert_eq!(report.total_original_bytes, 2000);
        assert_eq!(report.total_final_bytes, 500);
        assert_eq!(report.total_saved_bytes, 1500);
        assert_eq!(report.percent_reduction, 75.0);
        assert_eq!(report.num_variants(), 3);
        assert_eq!(report.assets[1].original_size, 500);
    }

    #[test]
    fn test_empty_run_has_zero_reduction() {
        let report = AggregateReport::aggregate("/in", "/out", Vec::new());
        assert_eq!(report.total_original_bytes, 0);
        assert_eq!(report.percent_reduction, 0.0);

        let zero_sized = AggregateReport::aggregate("/in", "/out", vec![asset(0, &[])]);
        assert_eq!(zero_sized.percent_reduction, 0.0);
    }

    #[test]
    fn test_saved_bytes_can_go_negative() {
        let report = AggregateReport::aggregate("/in", "/out", vec![asset(100, &[90, 80, 70])]);
        assert_eq!(report.total_saved_bytes, 100 - 240);
        assert_eq!(
            report.total_saved_bytes,
            report.total_original_bytes as i64 - report.total_final_bytes as i64
        );
        assert!(report.percent_reduction < 0.0);
    }

    #[test]
    fn test_improvement_policy() {
        assert!(improves_on(2_000_000, 150_000, false));
        assert!(!improves_on(1000, 1000, false));
        assert!(!improves_on(1000, 1001, false));
        assert!(improves_on(1000, 1001, true));
    }

    #[test]
    fn test_json_contract() {
        let mut report = AggregateReport::aggregate("/in", "/out", vec![asset(1000, &[100])]);
        report.assets[0].variants[0].width = Some(320);
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();

        assert_eq!(json["num_assets"], 1);
        assert_eq!(json["total_saved_bytes"], 900);
        assert_eq!(json["assets"][0]["variants"][0]["width"], 320);
        assert_eq!(json["assets"][0]["variants"][0]["format"], "webp");
        assert!(json["assets"][0].get("planned_paths").is_none());
    }

    #[tokio::test]
    async fn test_save_json_creates_parent_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports/run.json");
        let report = AggregateReport::aggregate("/in", "/out", vec![asset(10, &[5])]);

        report.save_json(&path).await.unwrap();
        let loaded: AggregateReport = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, report);
    }
}
