//! # Image Library Encoder Provider
//!
//! Fallback in-process basato sul crate `image`, usato quando ffmpeg manca o
//! fallisce. Copre solo WebP statico.
//!
//! ## Limiti:
//! L'encoder WebP del crate `image` 0.24 è solo lossless: a piena risoluzione
//! raramente batte un JPEG sorgente e la policy sulle dimensioni lo scarta.
//! Le varianti ridotte vengono ridimensionate prima dell'encoding, quindi
//! restano il caso in cui il fallback produce risultati utili.
//!
//! ## Pipeline:
//! 1. Decodifica del sorgente
//! 2. Downscale Lanczos3 solo se più largo della larghezza richiesta
//! 3. Encoding WebP sul thread pool bloccante di tokio

use super::{CandidateKind, EncoderProvider, VariantCandidate};
use crate::error::OptimizeError;
use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::path::Path;

pub struct ImageLibraryEncoder;

#[async_trait]
impl EncoderProvider for ImageLibraryEncoder {
    fn name(&self) -> &str {
        "image-library"
    }

    fn supports(&self, candidate: &VariantCandidate) -> bool {
        matches!(candidate.kind, CandidateKind::Image { .. }) && candidate.format == "webp"
    }

    async fn attempt(
        &self,
        source: &Path,
        destination: &Path,
        candidate: &VariantCandidate,
    ) -> Result<(), OptimizeError> {
        let source = source.to_path_buf();
        let destination = destination.to_path_buf();
        let width = candidate.width();

        let job_path = source.clone();
        tokio::task::spawn_blocking(move || encode_webp(&source, &destination, width))
            .await
            .map_err(|e| OptimizeError::Job {
                path: job_path,
                message: e.to_string(),
            })?
    }
}

fn encode_webp(source: &Path, destination: &Path, width: Option<u32>) -> Result<(), OptimizeError> {
    let img = image::open(source)?;
    let img = match width {
        Some(target) if img.width() > target => {
            let (w, h) = scaled_dimensions(img.width(), img.height(), target);
            img.resize_exact(w, h, FilterType::Lanczos3)
        }
        _ => img,
    };

    DynamicImage::ImageRgba8(img.to_rgba8()).save_with_format(destination, ImageFormat::WebP)?;
    Ok(())
}

/// Target size for a downscale to `target_width`, keeping the aspect ratio
fn scaled_dimensions(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    let ratio = target_width as f64 / width as f64;
    let height = ((height as f64) * ratio).round().max(1.0) as u32;
    (target_width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = ImageBuffer::from_fn(width, height, |x, y| Rgb([(x * 7) as u8, (y * 5) as u8, 90u8]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(1000, 500, 320), (320, 160));
        assert_eq!(scaled_dimensions(3000, 1, 300), (300, 1));
        assert_eq!(scaled_dimensions(999, 333, 640), (640, 213));
    }

    #[test]
    fn test_supports_only_webp_stills() {
        let encoder = ImageLibraryEncoder;
        assert!(encoder.supports(&VariantCandidate::image("webp", Some(320))));
        assert!(!encoder.supports(&VariantCandidate::image("avif", None)));
        let preset = crate::config::VideoPreset::new("-webm", ".webm");
        assert!(!encoder.supports(&VariantCandidate::video(&preset, 28)));
    }

    #[tokio::test]
    async fn test_downscales_to_requested_width() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("wide.png");
        write_png(&src, 40, 20);
        let dest = dir.path().join("wide.w10.webp");

        ImageLibraryEncoder
            .attempt(&src, &dest, &VariantCandidate::image("webp", Some(10)))
            .await
            .unwrap();
        assert_eq!(image::image_dimensions(&dest).unwrap(), (10, 5));
    }

    #[tokio::test]
    async fn test_never_upscales() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("small.png");
        write_png(&src, 16, 8);
        let dest = dir.path().join("small.w320.webp");

        ImageLibraryEncoder
            .attempt(&src, &dest, &VariantCandidate::image("webp", Some(320)))
            .await
            .unwrap();
        assert_eq!(image::image_dimensions(&dest).unwrap(), (16, 8));
    }

    #[tokio::test]
    async fn test_undecodable_source_fails() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("broken.png");
        std::fs::write(&src, b"not a png").unwrap();

        let result = ImageLibraryEncoder
            .attempt(&src, &dir.path().join("broken.webp"), &VariantCandidate::image("webp", None))
            .await;
        assert!(result.is_err());
    }
}
