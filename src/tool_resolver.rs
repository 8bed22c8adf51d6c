//! # Tool Path Resolver
//!
//! Finds the external transcoder once per run and records what the pipeline
//! can do with it. Lookup order:
//! - explicit path from configuration
//! - `TOOLS_DIR` bundled directory (`<dir>/<os>/ffmpeg[.exe]`)
//! - system `PATH`

use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Capabilities detected at run start and handed to the planners
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    /// Resolved ffmpeg binary, if any
    pub ffmpeg: Option<PathBuf>,
    /// The in-process image library fallback (always compiled in)
    pub image_library: bool,
}

impl Capabilities {
    /// Probe the environment; runs once, never per encode
    pub fn detect(ffmpeg_override: Option<&Path>) -> Self {
        let resolver = ToolPathResolver::new();
        let ffmpeg = match ffmpeg_override {
            Some(path) if path.exists() => Some(path.to_path_buf()),
            Some(path) => {
                warn!("Configured ffmpeg {} not found, falling back to lookup", path.display());
                resolver.resolve_tool("ffmpeg")
            }
            None => resolver.resolve_tool("ffmpeg"),
        };

        Self {
            ffmpeg,
            image_library: true,
        }
    }

    /// Log what the run will be able to produce
    pub fn log_report(&self) {
        info!("🔧 Encoder capabilities:");
        match self.ffmpeg {
            Some(ref path) => info!("  ✅ ffmpeg - images (all formats) and video -> {}", path.display()),
            None => info!("  ❌ ffmpeg - video variants and AVIF will be skipped"),
        }
        let status = if self.image_library { "✅" } else { "❌" };
        info!("  {} image library - WebP fallback", status);
    }
}

/// Tool path resolver for bundled and system installs
pub struct ToolPathResolver {
    /// Directory with bundled binaries, from `TOOLS_DIR`
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    pub fn new() -> Self {
        let tools_dir = env::var_os("TOOLS_DIR")
            .map(PathBuf::from)
            .filter(|p| p.is_dir());
        debug!("Bundled tools directory: {:?}", tools_dir);
        Self { tools_dir }
    }

    pub fn with_tools_dir(tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            tools_dir: Some(tools_dir.into()),
        }
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        if let Some(ref tools_dir) = self.tools_dir {
            let bundled = Self::bundled_tool_path(tools_dir, tool_name);
            if bundled.is_file() {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled);
                return Some(bundled);
            }
        }

        match which::which(tool_name) {
            Ok(path) => {
                debug!("Using system tool: {} -> {:?}", tool_name, path);
                Some(path)
            }
            Err(_) => {
                warn!("Tool not found: {}", tool_name);
                None
            }
        }
    }

    /// Expected path for a bundled tool: `tools/{platform}/{tool}[.exe]`
    fn bundled_tool_path(tools_dir: &Path, tool_name: &str) -> PathBuf {
        let platform = match env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let extension = if cfg!(target_os = "windows") { ".exe" } else { "" };
        tools_dir.join(platform).join(format!("{}{}", tool_name, extension))
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bundled_tool_wins_over_path() {
        let dir = TempDir::new().unwrap();
        let platform = if env::consts::OS == "macos" { "darwin" } else { env::consts::OS };
        let extension = if cfg!(target_os = "windows") { ".exe" } else { "" };
        let bundled = dir.path().join(platform).join(format!("ffmpeg{}", extension));
        std::fs::create_dir_all(bundled.parent().unwrap()).unwrap();
        std::fs::write(&bundled, b"#!/bin/sh\n").unwrap();

        let resolver = ToolPathResolver::with_tools_dir(dir.path());
        assert_eq!(resolver.resolve_tool("ffmpeg"), Some(bundled));
    }

    #[test]
    fn test_unknown_tool_is_unavailable() {
        let resolver = ToolPathResolver::with_tools_dir("/definitely/not/here");
        assert_eq!(resolver.resolve_tool("no-such-encoder-binary-xyz"), None);
    }

    #[test]
    fn test_explicit_override_is_used() {
        let dir = TempDir::new().unwrap();
        let fake = dir.path().join("my-ffmpeg");
        std::fs::write(&fake, b"").unwrap();

        let caps = Capabilities::detect(Some(&fake));
        assert_eq!(caps.ffmpeg, Some(fake));
        assert!(caps.image_library);
    }
}
