//! # Web Asset Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom del livello di encoding
//! - `file_manager`: Discovery degli asset e utilità sui file
//! - `tool_resolver`: Rilevamento di ffmpeg e delle capability
//! - `process_supervisor`: Esecuzione di encode esterni con deadline e kill
//! - `encoder`: Catena di provider (ffmpeg, image crate)
//! - `image_processor`: Varianti responsive per le immagini
//! - `video_processor`: Ricerca CRF ed eliminazione tra preset per i video
//! - `optimizer`: Scheduling concorrente dei job per-asset
//! - `report`: Report per-asset e aggregato
//! - `snippets`: Snippet HTML `<picture>` / `<video>`
//! - `progress`: Progress bar e contatori dei job
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use web_asset_optimizer::{Config, MediaOptimizer};
//!
//! let optimizer = MediaOptimizer::new(Config::default())?;
//! let report = optimizer.run(&path).await?;
//! report.save_json(Path::new("report.json")).await?;
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod optimizer;
pub mod process_supervisor;
pub mod progress;
pub mod report;
pub mod snippets;
pub mod tool_resolver;
pub mod video_processor;

pub use config::Config;
pub use error::OptimizeError;
pub use optimizer::MediaOptimizer;
pub use report::{AggregateReport, AssetReport, VariantResult};
