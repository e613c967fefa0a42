//! Generate images with a true alpha channel via two-pass difference matting.
//!
//! Image models cannot emit transparency directly, but they can render the
//! same subject on a pure white and a pure black backdrop. Comparing the two
//! renders pixel by pixel recovers real per-pixel opacity: an opaque pixel
//! looks identical on both backdrops, a transparent one shows the backdrop
//! itself, and everything in between interpolates linearly.
//!
//! # Quick Start
//!
//! ```no_run
//! use gemini_transparency::{GeminiClient, GenerationOptions, Generator};
//!
//! let client = GeminiClient::from_env().expect("API key not configured");
//! let generator = Generator::new(client);
//!
//! let opts = GenerationOptions::default();
//! let rgba = generator
//!     .generate_transparent("a cute banana sticker", &opts)
//!     .unwrap();
//! gemini_transparency::save_rgba(&rgba, "sticker.png".as_ref()).unwrap();
//! ```
//!
//! # Matting without a model
//!
//! The extraction math is a pure function; any pair of same-size renders
//! works:
//!
//! ```no_run
//! use gemini_transparency::extract_alpha;
//!
//! let on_white = image::open("white.png").unwrap().to_rgb8();
//! let on_black = image::open("black.png").unwrap().to_rgb8();
//! let rgba = extract_alpha(&on_white, &on_black).unwrap();
//! rgba.save("result.png").unwrap();
//! ```

#![deny(missing_docs)]

pub mod client;
pub mod error;
pub mod matting;
pub mod pipeline;
pub mod retry;

pub use client::{
    resolve_api_key, AspectRatio, GeminiClient, GenerationRequest, ImageSize, ModelClient,
    ResponsePayload, DEFAULT_MODEL,
};
pub use error::{Error, Result};
pub use matting::{background_is_black, extract_alpha, DEFAULT_BLACK_THRESHOLD};
pub use pipeline::{
    save_opaque, save_rgba, GenerationOptions, Generator, BLACK_BACKDROP_PROMPT,
    WHITE_BACKDROP_SUFFIX,
};
pub use retry::RetryOutcome;
