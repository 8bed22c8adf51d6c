//! # Error Types Module
//!
//! Questo modulo definisce i tipi di errore custom della pipeline.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` per categorizzare gli errori del livello di encoding
//! - Distingue le cause di fallimento di un tentativo (timeout, exit code, I/O)
//! - Integra con `thiserror` per la conversione automatica degli errori standard
//!
//! ## Categorie di errori:
//! - `CapabilityUnavailable`: Nessun encoder disponibile per il formato richiesto
//! - `AttemptFailed`: Un singolo tentativo di encoding è fallito
//! - `Timeout`: Il processo esterno ha superato la deadline ed è stato terminato
//! - `Job`: Un intero job per-asset è fallito (panic o errore inatteso)
//! - `Config`: Configurazione o directory di input non valida (fatale)
//!
//! ## Politica di propagazione:
//! Tutti gli errori di encoding vengono assorbiti dai planner e trasformati in
//! "nessuna variante". Solo `Config` arriva fino a `main` e interrompe il run.

use std::path::PathBuf;
use std::time::Duration;

/// Custom error types for asset optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("No encoder available for {0}")]
    CapabilityUnavailable(String),

    #[error("{tool} exited with {status}")]
    AttemptFailed { tool: String, status: String },

    #[error("{tool} timed out after {elapsed:?}")]
    Timeout { tool: String, elapsed: Duration },

    #[error("Encoder produced no usable output at {0}")]
    MissingOutput(PathBuf),

    #[error("Job failed for {path}: {message}")]
    Job { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl OptimizeError {
    /// Whether this error is absorbed by the planners instead of failing the job
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, OptimizeError::Config(_))
    }
}
