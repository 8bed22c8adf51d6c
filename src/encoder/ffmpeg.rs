//! # FFmpeg Encoder Provider
//!
//! Provider primario: costruisce la command line di ffmpeg per ogni
//! candidata e la esegue sotto il `ProcessSupervisor`.
//!
//! ## Immagini:
//! - **WebP**: libwebp lossy con qualità configurabile
//! - **AVIF**: libaom-av1 a CRF costante
//! - altri formati: codec dedotto da ffmpeg dall'estensione
//! - ridimensionamento con `scale='min(W,iw)':'-2'` (mai upscale, altezza pari)
//!
//! ## Video (per container):
//! - **mp4**: libx264 + AAC
//! - **webm**: libvpx-vp9 + Opus
//! - altri: libx264

use super::{CandidateKind, EncoderProvider, VariantCandidate};
use crate::config::Config;
use crate::error::OptimizeError;
use crate::process_supervisor::ProcessSupervisor;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Codec knobs taken from the configuration
#[derive(Debug, Clone)]
pub struct FfmpegSettings {
    pub webp_quality: u8,
    pub avif_crf: u8,
    pub video_speed: String,
    pub audio_bitrate: String,
}

impl From<&Config> for FfmpegSettings {
    fn from(config: &Config) -> Self {
        Self {
            webp_quality: config.webp_quality,
            avif_crf: config.avif_crf,
            video_speed: config.video_speed.clone(),
            audio_bitrate: config.audio_bitrate.clone(),
        }
    }
}

pub struct FfmpegEncoder {
    binary: PathBuf,
    settings: FfmpegSettings,
    image_supervisor: ProcessSupervisor,
    video_supervisor: ProcessSupervisor,
}

impl FfmpegEncoder {
    pub fn new(binary: PathBuf, config: &Config) -> Self {
        Self {
            binary,
            settings: FfmpegSettings::from(config),
            image_supervisor: ProcessSupervisor::new(config.image_timeout(), config.kill_grace()),
            video_supervisor: ProcessSupervisor::new(config.video_timeout(), config.kill_grace()),
        }
    }

    fn command(&self, args: Vec<OsString>) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd
    }
}

#[async_trait]
impl EncoderProvider for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn supports(&self, _candidate: &VariantCandidate) -> bool {
        true
    }

    async fn attempt(
        &self,
        source: &Path,
        destination: &Path,
        candidate: &VariantCandidate,
    ) -> Result<(), OptimizeError> {
        let (args, supervisor) = match candidate.kind {
            CandidateKind::Image { width } => (
                image_args(source, destination, &candidate.format, width, &self.settings),
                &self.image_supervisor,
            ),
            CandidateKind::Video { crf, .. } => (
                video_args(source, destination, &candidate.format, crf, &self.settings),
                &self.video_supervisor,
            ),
        };

        debug!(
            "🔄 ffmpeg {} -> {} (deadline {:?})",
            source.display(),
            destination.display(),
            supervisor.deadline()
        );
        supervisor.run(self.command(args), destination).await
    }
}

fn os(values: &[&str]) -> Vec<OsString> {
    values.iter().map(OsString::from).collect()
}

/// ffmpeg arguments for a still image variant
pub fn image_args(
    source: &Path,
    destination: &Path,
    format: &str,
    width: Option<u32>,
    settings: &FfmpegSettings,
) -> Vec<OsString> {
    let mut args = os(&["-y", "-loglevel", "error", "-i"]);
    args.push(source.as_os_str().to_owned());

    if let Some(width) = width {
        args.push("-vf".into());
        args.push(format!("scale='min({},iw)':'-2'", width).into());
    }

    match format {
        "webp" => {
            args.extend(os(&["-c:v", "libwebp", "-lossless", "0", "-q:v"]));
            args.push(settings.webp_quality.to_string().into());
        }
        "avif" => {
            args.extend(os(&["-c:v", "libaom-av1", "-crf"]));
            args.push(settings.avif_crf.to_string().into());
            args.extend(os(&["-b:v", "0"]));
        }
        _ => {}
    }

    args.push(destination.as_os_str().to_owned());
    args
}

/// ffmpeg arguments for one CRF step of a video preset
pub fn video_args(
    source: &Path,
    destination: &Path,
    container: &str,
    crf: u8,
    settings: &FfmpegSettings,
) -> Vec<OsString> {
    let mut args = os(&["-y", "-loglevel", "error", "-i"]);
    args.push(source.as_os_str().to_owned());
    let crf = crf.to_string();

    match container {
        "webm" => {
            args.extend(os(&["-c:v", "libvpx-vp9", "-crf", &crf, "-b:v", "0", "-c:a", "libopus"]));
        }
        "mp4" => {
            args.extend(os(&["-c:v", "libx264", "-crf", &crf, "-preset", &settings.video_speed]));
            args.extend(os(&["-c:a", "aac", "-b:a", &settings.audio_bitrate]));
        }
        _ => {
            args.extend(os(&["-c:v", "libx264", "-crf", &crf, "-preset", &settings.video_speed]));
        }
    }

    args.push(destination.as_os_str().to_owned());
    args
}
