//! # Optimizer Module
//!
//! Separa le responsabilità dello scheduling in sottomoduli:
//! - `media_optimizer`: Orchestratore principale (fan-out/fan-in dei job)
//! - `task_optimizer`: Worker per singoli asset
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod media_optimizer;
pub mod path_resolver;
pub mod task_optimizer;

pub use media_optimizer::MediaOptimizer;
pub use path_resolver::PathResolver;
pub use task_optimizer::TaskOptimizer;
