//! # Web Asset Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing` (`RUST_LOG` o `-v`)
//! - Merge della configurazione: file JSON opzionale, poi flag espliciti
//! - Avvio dell'optimizer e scrittura di report JSON e snippet HTML
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Costruisce e valida la `Config`
//! 4. Esegue il run e salva `report.json` e `snippets.html`
//! 5. Logga il riepilogo finale
//!
//! ## Esempio di utilizzo:
//! ```bash
//! asset-optimizer ./static --formats webp,avif --sizes 480,960 -w 8 --report out/report.json
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use web_asset_optimizer::config::{parse_formats, parse_video_presets, parse_widths};
use web_asset_optimizer::{snippets, Config, MediaOptimizer};

#[derive(Parser)]
#[command(name = "asset-optimizer")]
#[command(about = "Generate responsive, size-checked image and video variants for the web")]
struct Args {
    /// Directory containing the assets to optimize
    input: PathBuf,

    /// Output directory (default: <input>_optimized next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Image formats to generate, csv [default: webp,avif]
    #[arg(long)]
    formats: Option<String>,

    /// Responsive widths, csv [default: 320,640,1280]
    #[arg(long)]
    sizes: Option<String>,

    /// Video presets as suffix:extension, csv [default: -mp4:.mp4,-webm:.webm]
    #[arg(long, allow_hyphen_values = true)]
    video_presets: Option<String>,

    /// Number of parallel workers [default: 4]
    #[arg(short, long)]
    workers: Option<usize>,

    /// Only compute destination paths, write no variants
    #[arg(long)]
    dry_run: bool,

    /// Keep variants even when they are not smaller than the original
    #[arg(long)]
    keep_larger: bool,

    /// Path of the JSON report
    #[arg(long, default_value = "report.json")]
    report: PathBuf,

    /// Path of the HTML snippets (default: <output>/snippets.html)
    #[arg(long)]
    snippets: Option<PathBuf>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Explicit ffmpeg binary
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Deadline of a single video attempt, in seconds [default: 120]
    #[arg(long)]
    video_timeout: Option<u64>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Layer the flags over the configuration file (or defaults)
    async fn into_config(self) -> Result<(Config, Args)> {
        let mut config = match self.config {
            Some(ref path) => Config::from_file(path).await?,
            None => Config::default(),
        };

        if let Some(ref output) = self.output {
            config.output_path = Some(output.clone());
        }
        if let Some(ref formats) = self.formats {
            config.image_formats = parse_formats(formats);
        }
        if let Some(ref sizes) = self.sizes {
            config.widths = parse_widths(sizes)?;
        }
        if let Some(ref presets) = self.video_presets {
            config.video_presets = parse_video_presets(presets);
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(ref ffmpeg) = self.ffmpeg {
            config.ffmpeg_path = Some(ffmpeg.clone());
        }
        if let Some(secs) = self.video_timeout {
            config.video_timeout_secs = secs;
        }
        config.dry_run |= self.dry_run;
        config.keep_larger |= self.keep_larger;
        if self.no_progress {
            config.show_progress = false;
        }

        config.validate()?;
        Ok((config, self))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (config, args) = args.into_config().await?;
    let dry_run = config.dry_run;

    let optimizer = MediaOptimizer::new(config)?;
    let report = optimizer.run(&args.input).await?;

    report.save_json(&args.report).await?;
    info!("💾 Report saved to {}", args.report.display());

    let snippets_path = args
        .snippets
        .unwrap_or_else(|| report.output_dir.join("snippets.html"));
    if dry_run {
        info!("Dry run: snippets not written ({})", snippets_path.display());
    } else {
        snippets::write_snippets(&report, &snippets_path).await?;
        info!("💾 Snippets saved to {}", snippets_path.display());
    }

    report.log_summary();
    Ok(())
}
