//! # Path Resolution Module
//!
//! Centralizza tutta la logica di calcolo dei path di output.
//! Evita duplicazione tra i planner immagine e video.
//!
//! ```text
//! Input root:  /site/static
//! Asset:       /site/static/img/hero.jpg
//! Output root: /site/static_optimized
//! Variante:    /site/static_optimized/img/hero.w320.webp
//! ```
//!
//! Due asset nella stessa directory con lo stesso stem (`logo.jpg`, `logo.png`)
//! produrrebbero gli stessi file: per questi lo stem include l'estensione
//! sorgente (`logo.jpg.webp`, `logo.png.webp`).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Maps source assets to destinations under the output root
#[derive(Debug, Clone)]
pub struct PathResolver {
    input_root: PathBuf,
    output_root: PathBuf,
    /// Sources whose output stem is their full file name
    qualified: HashSet<PathBuf>,
}

impl PathResolver {
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            qualified: HashSet::new(),
        }
    }

    /// Give every source in `sources` a destination stem no other source shares
    pub fn with_unique_stems<'a>(mut self, sources: impl IntoIterator<Item = &'a Path>) -> Self {
        let sources: Vec<&Path> = sources.into_iter().collect();

        // Qualifying uses the file name, unique per directory, so this settles
        loop {
            let mut by_stem: HashMap<(Option<&Path>, String), Vec<&Path>> = HashMap::new();
            for &source in &sources {
                by_stem
                    .entry((source.parent(), self.output_stem(source)))
                    .or_default()
                    .push(source);
            }

            let colliding: Vec<&Path> = by_stem
                .into_values()
                .filter(|group| group.len() > 1)
                .flatten()
                .filter(|source| !self.qualified.contains(*source))
                .collect();
            if colliding.is_empty() {
                break;
            }
            for source in colliding {
                warn!("⚠️ Stem shared with another asset, naming outputs after {}", source.display());
                self.qualified.insert(source.to_path_buf());
            }
        }
        self
    }

    fn output_stem(&self, source: &Path) -> String {
        let stem = if self.qualified.contains(source) {
            source.file_name()
        } else {
            source.file_stem()
        };
        stem.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
    }

    /// `<output_root>/<rel_dir>/<stem><suffix><extension>`
    ///
    /// `extension` is appended verbatim, so it carries its own dot.
    pub fn output_path(&self, source: &Path, suffix: &str, extension: &str) -> PathBuf {
        let filename = format!("{}{}{}", self.output_stem(source), suffix, extension);

        let relative_dir = source
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.input_root).ok())
            .unwrap_or_else(|| {
                debug!(
                    "{} is outside {}, writing at output root",
                    source.display(),
                    self.input_root.display()
                );
                Path::new("")
            });

        self.output_root.join(relative_dir).join(filename)
    }

    /// Suffix of an image variant: `.w<W>`, empty for full size
    pub fn width_suffix(width: Option<u32>) -> String {
        width.map(|w| format!(".w{}", w)).unwrap_or_default()
    }
}
