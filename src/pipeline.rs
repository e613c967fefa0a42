//! Two-pass acquisition pipeline: white render, validated black edit, matte.

use std::path::Path;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};

use crate::client::{AspectRatio, GenerationRequest, ImageSize, ModelClient, ResponsePayload};
use crate::error::{Error, Result};
use crate::matting;
use crate::retry::{self, RetryOutcome};

/// Default number of black-background edit attempts.
pub const DEFAULT_MAX_BLACK_ATTEMPTS: u32 = 5;

/// Default pause between black-background edit attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Appended to the user prompt for the white-background render.
pub const WHITE_BACKDROP_SUFFIX: &str = "\n\nIMPORTANT: Use a pure white background \
    (#FFFFFF, RGB 255,255,255). Do not use white anywhere on the subject itself.";

/// Full instruction for the black-background edit pass.
pub const BLACK_BACKDROP_PROMPT: &str = "Replace ONLY the background with pure black \
    (#000000, RGB 0,0,0).\n\nKeep EVERYTHING else exactly unchanged:\n\
    - Same subject in exact same position\n- Same colors on the subject\n\
    - Same details and features\n\nOnly change the white background pixels to pure black.";

/// Options controlling a generation run.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Requested aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Requested resolution tier.
    pub image_size: ImageSize,
    /// Model identifier.
    pub model: String,
    /// Maximum black-background edit attempts before giving up.
    pub max_black_attempts: u32,
    /// Pause between edit attempts.
    pub retry_delay: Duration,
    /// Suppress progress output on stderr.
    pub quiet: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::Square,
            image_size: ImageSize::TwoK,
            model: crate::client::DEFAULT_MODEL.to_string(),
            max_black_attempts: DEFAULT_MAX_BLACK_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            quiet: false,
        }
    }
}

/// Drives the model client through the two-pass acquisition sequence.
///
/// Generic over [`ModelClient`] so the sequencing and retry behavior can be
/// exercised without network access.
pub struct Generator<C> {
    client: C,
}

impl<C: ModelClient> Generator<C> {
    /// Wrap a model client.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Consume the generator and return the wrapped client.
    pub fn into_inner(self) -> C {
        self.client
    }

    /// Generate a single opaque image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyResponse`] if the model returned no image
    /// payload, or any client/codec error.
    pub fn generate(&self, prompt: &str, opts: &GenerationOptions) -> Result<DynamicImage> {
        let request = GenerationRequest::new(
            prompt,
            opts.aspect_ratio,
            opts.image_size,
            opts.model.clone(),
        );
        let bytes = match self.client.generate(&request)? {
            ResponsePayload::Image(bytes) => bytes,
            ResponsePayload::Text(_) | ResponsePayload::Empty => return Err(Error::EmptyResponse),
        };
        Ok(image::load_from_memory(&bytes)?)
    }

    /// Generate an image with a true alpha channel.
    ///
    /// Renders the subject on a white backdrop, edits the render to a black
    /// backdrop (retrying until the corner check passes), then recovers
    /// per-pixel opacity by difference matting.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyResponse`] if the white render produced no image
    ///   (fatal, not retried);
    /// - [`Error::ExhaustedRetries`] if no edit attempt produced a clean
    ///   black background;
    /// - any client or codec error, which aborts immediately.
    pub fn generate_transparent(&self, prompt: &str, opts: &GenerationOptions) -> Result<RgbaImage> {
        progress(opts, "Step 1/3: generating on white background...");
        let white_prompt = format!("{prompt}{WHITE_BACKDROP_SUFFIX}");
        let request = GenerationRequest::new(
            white_prompt,
            opts.aspect_ratio,
            opts.image_size,
            opts.model.clone(),
        );
        let white_bytes = match self.client.generate(&request)? {
            ResponsePayload::Image(bytes) => bytes,
            ResponsePayload::Text(_) | ResponsePayload::Empty => return Err(Error::EmptyResponse),
        };
        let on_white = image::load_from_memory(&white_bytes)?.to_rgb8();

        progress(opts, "Step 2/3: converting to black background...");
        let on_black = self.convert_to_black(white_bytes, opts)?;

        progress(opts, "Step 3/3: extracting transparency...");
        matting::extract_alpha(&on_white, &on_black)
    }

    /// Edit the white render onto a black backdrop, retrying until the
    /// corner check passes or the attempt budget runs out.
    fn convert_to_black(&self, white_bytes: Vec<u8>, opts: &GenerationOptions) -> Result<RgbImage> {
        let edit = GenerationRequest::new(
            BLACK_BACKDROP_PROMPT,
            opts.aspect_ratio,
            opts.image_size,
            opts.model.clone(),
        )
        .with_reference_image(white_bytes);

        let outcome = retry::run(
            opts.max_black_attempts,
            opts.retry_delay,
            |attempt| -> Result<Option<RgbImage>> {
                if attempt > 1 && !opts.quiet {
                    eprintln!(
                        "  retry {attempt}/{} - background not black enough...",
                        opts.max_black_attempts
                    );
                }
                match self.client.generate(&edit)? {
                    ResponsePayload::Image(bytes) => {
                        Ok(Some(image::load_from_memory(&bytes)?.to_rgb8()))
                    }
                    ResponsePayload::Text(_) | ResponsePayload::Empty => Ok(None),
                }
            },
            |img| matting::background_is_black(img, matting::DEFAULT_BLACK_THRESHOLD),
        )?;

        match outcome {
            RetryOutcome::Success(img) => Ok(img),
            RetryOutcome::Exhausted { attempts } => Err(Error::ExhaustedRetries { attempts }),
        }
    }
}

fn progress(opts: &GenerationOptions, message: &str) {
    if !opts.quiet {
        eprintln!("{message}");
    }
}

/// Save an RGBA image to a format that preserves the alpha channel.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for formats without 8-bit alpha
/// (e.g. JPEG), or an encode/IO error.
pub fn save_rgba(img: &RgbaImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Tiff => {
            img.save_with_format(path, format)?;
            Ok(())
        }
        other => Err(Error::UnsupportedFormat(format!(
            "{other:?} cannot store an alpha channel"
        ))),
    }
}

/// Save an opaque image with format-specific quality settings.
///
/// # Errors
///
/// Returns an error if the format cannot be inferred from the path or
/// writing fails.
pub fn save_opaque(img: &DynamicImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            let file = std::fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(img)?;
            Ok(())
        }
        _ => {
            img.save(path)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_documented_defaults() {
        let opts = GenerationOptions::default();
        assert_eq!(opts.aspect_ratio, AspectRatio::Square);
        assert_eq!(opts.image_size, ImageSize::TwoK);
        assert_eq!(opts.model, crate::client::DEFAULT_MODEL);
        assert_eq!(opts.max_black_attempts, 5);
        assert_eq!(opts.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn backdrop_prompts_pin_the_exact_colors() {
        assert!(WHITE_BACKDROP_SUFFIX.contains("255,255,255"));
        assert!(WHITE_BACKDROP_SUFFIX.contains("#FFFFFF"));
        assert!(BLACK_BACKDROP_PROMPT.contains("0,0,0"));
        assert!(BLACK_BACKDROP_PROMPT.contains("#000000"));
    }

    #[test]
    fn save_rgba_rejects_formats_without_alpha() {
        let img = RgbaImage::new(1, 1);
        let err = save_rgba(&img, Path::new("out.jpg")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn save_rgba_rejects_unknown_extensions() {
        let img = RgbaImage::new(1, 1);
        let err = save_rgba(&img, Path::new("out.xyz")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}
