//! Image transcoding seam and its ImageMagick implementation.

use async_trait::async_trait;
use derive_getters::Getters;
use herald_error::{ConfigError, TranscodeError, TranscodeErrorKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, instrument};

/// What the identify step learned about an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// File size in bytes
    pub size: u64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Lowercase format name (`png`, `jpeg`, ...)
    pub format: String,
}

/// External tool that makes images displayable inline.
///
/// Both calls are slow and cannot be cancelled midway.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Inspect a local image.
    async fn identify(&self, path: &Path) -> Result<ImageInfo, TranscodeError>;

    /// Whether an identified image must be transcoded before inline display.
    fn needs_transcode(&self, info: &ImageInfo) -> bool;

    /// Produce a displayable copy of a local image and return its path.
    async fn transcode(&self, path: &Path) -> Result<PathBuf, TranscodeError>;
}

/// Tool locations and output limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct TranscoderConfig {
    /// `convert` binary
    #[serde(default = "default_convert_path")]
    convert_path: String,
    /// `identify` binary
    #[serde(default = "default_identify_path")]
    identify_path: String,
    /// Bounding box, `WIDTHxHEIGHT`
    #[serde(default = "default_max_dimensions")]
    max_dimensions: String,
    /// JPEG quality of converted images
    #[serde(default = "default_jpeg_quality")]
    jpeg_quality: u8,
    /// Largest image displayed without conversion, in bytes
    #[serde(default = "default_max_bytes")]
    max_bytes: u64,
}

fn default_convert_path() -> String {
    "convert".to_string()
}

fn default_identify_path() -> String {
    "identify".to_string()
}

fn default_max_dimensions() -> String {
    "3840x3840".to_string()
}

fn default_jpeg_quality() -> u8 {
    95
}

fn default_max_bytes() -> u64 {
    5_000_000
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            convert_path: default_convert_path(),
            identify_path: default_identify_path(),
            max_dimensions: default_max_dimensions(),
            jpeg_quality: default_jpeg_quality(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl TranscoderConfig {
    /// Parse `max_dimensions` into `(width, height)`.
    #[track_caller]
    pub fn dimensions(&self) -> Result<(u32, u32), ConfigError> {
        parse_dimensions(&self.max_dimensions).ok_or_else(|| {
            ConfigError::new(format!(
                "max_dimensions {:?} is not WIDTHxHEIGHT",
                self.max_dimensions
            ))
        })
    }

    /// Check the limits.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (width, height) = self.dimensions()?;
        if width == 0 || height == 0 {
            return Err(ConfigError::new("max_dimensions must be non-zero"));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::new(format!(
                "jpeg_quality {} is outside 1..=100",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

fn parse_dimensions(value: &str) -> Option<(u32, u32)> {
    let (width, height) = value.trim().split_once('x')?;
    Some((width.parse().ok()?, height.parse().ok()?))
}

/// Image formats displayed inline as-is.
const INLINE_FORMATS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Transcoder running ImageMagick's `identify` and `convert`.
#[derive(Debug, Clone)]
pub struct ImageMagick {
    config: TranscoderConfig,
    max_width: u32,
    max_height: u32,
}

impl ImageMagick {
    /// Create a transcoder from validated settings.
    ///
    /// # Errors
    ///
    /// Returns error if the limits are malformed.
    pub fn new(config: TranscoderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (max_width, max_height) = config.dimensions()?;
        Ok(Self {
            config,
            max_width,
            max_height,
        })
    }

    /// Settings in use.
    pub fn config(&self) -> &TranscoderConfig {
        &self.config
    }
}

/// Parse one line of `identify` output for `path`.
///
/// The output looks like `<path> <FORMAT> <W>x<H> <geometry> ...`; multi-frame
/// images print one line per frame and only the first is used.
fn parse_identify(path: &str, output: &str) -> Result<(String, u32, u32), TranscodeError> {
    let unexpected = || {
        TranscodeError::new(TranscodeErrorKind::UnexpectedOutput(format!(
            "while identifying {}, weird info has gotten {:?}",
            path, output
        )))
    };
    let line = output.lines().next().ok_or_else(unexpected)?;
    let rest = line.strip_prefix(path).unwrap_or(line);
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let (format, (width, height)) = tokens
        .windows(2)
        .find_map(|pair| {
            let is_format = pair[0].chars().all(|c| c.is_ascii_alphanumeric());
            is_format
                .then(|| parse_dimensions(pair[1]))
                .flatten()
                .map(|dims| (pair[0].to_lowercase(), dims))
        })
        .ok_or_else(unexpected)?;
    Ok((format, width, height))
}

#[async_trait]
impl Transcoder for ImageMagick {
    #[instrument(skip_all, fields(path = %path.display()))]
    async fn identify(&self, path: &Path) -> Result<ImageInfo, TranscodeError> {
        let display = path.display().to_string();
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            TranscodeError::new(TranscodeErrorKind::Identify {
                path: display.clone(),
                message: e.to_string(),
            })
        })?;

        let output = Command::new(&self.config.identify_path)
            .arg(path)
            .output()
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(TranscodeError::new(TranscodeErrorKind::Identify {
                path: display,
                message: format!(
                    "{}\n{}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                ),
            }));
        }

        let (format, width, height) = parse_identify(&display, &stdout)?;
        debug!(format = %format, width, height, size = metadata.len(), "Identified image");
        Ok(ImageInfo {
            size: metadata.len(),
            width,
            height,
            format,
        })
    }

    fn needs_transcode(&self, info: &ImageInfo) -> bool {
        info.size > self.config.max_bytes
            || info.width > self.max_width
            || info.height > self.max_height
            || !INLINE_FORMATS.contains(&info.format.as_str())
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn transcode(&self, path: &Path) -> Result<PathBuf, TranscodeError> {
        let mut target = path.as_os_str().to_owned();
        target.push(".jpg");
        let target = PathBuf::from(target);

        let output = Command::new(&self.config.convert_path)
            .arg("-strip")
            .arg("-resize")
            .arg(&self.config.max_dimensions)
            .arg("-quality")
            .arg(self.config.jpeg_quality.to_string())
            .arg(path)
            .arg(&target)
            .output()
            .await?;
        if !output.status.success() {
            return Err(TranscodeError::new(TranscodeErrorKind::Convert {
                path: path.display().to_string(),
                message: format!(
                    "{}\n{}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                ),
            }));
        }

        debug!(target = %target.display(), "Converted image");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_output_is_parsed() {
        let output = "/tmp/a b.png PNG 800x600 800x600+0+0 8-bit sRGB 1.2MB 0.000u 0:00.000\n";
        assert_eq!(
            parse_identify("/tmp/a b.png", output).unwrap(),
            ("png".to_string(), 800, 600)
        );
    }

    #[test]
    fn multi_frame_output_uses_first_frame() {
        let output = "x.gif[0] GIF 10x20 10x20+0+0\nx.gif[1] GIF 10x20 10x20+0+0\n";
        assert_eq!(
            parse_identify("x.gif", output).unwrap(),
            ("gif".to_string(), 10, 20)
        );
    }

    #[test]
    fn garbage_output_is_rejected() {
        assert!(parse_identify("x", "").is_err());
        assert!(parse_identify("x", "x PNG").is_err());
        assert!(parse_identify("x", "x PNG wide").is_err());
    }

    #[test]
    fn dimensions_must_be_width_by_height() {
        assert_eq!(parse_dimensions("3840x2160"), Some((3840, 2160)));
        assert_eq!(parse_dimensions("3840"), None);
        assert_eq!(parse_dimensions("ax1"), None);
    }
}
