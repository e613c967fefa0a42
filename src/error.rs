//! Error types for the gemini-transparency crate.

/// Errors that can occur during generation and alpha extraction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No API key found in the environment or `.env` file.
    #[error("no API key found; set GOOGLE_API_KEY or GEMINI_API_KEY")]
    MissingApiKey,

    /// The model response contained no image payload.
    #[error("model returned no image payload")]
    EmptyResponse,

    /// The black-background conversion never passed validation.
    #[error("background was not black after {attempts} attempts")]
    ExhaustedRetries {
        /// Number of edit attempts made before giving up.
        attempts: u32,
    },

    /// The two matting inputs have different dimensions.
    #[error(
        "matting inputs differ in size: {white_width}x{white_height} (white) \
         vs {black_width}x{black_height} (black)"
    )]
    ShapeMismatch {
        /// Width of the white-background render.
        white_width: u32,
        /// Height of the white-background render.
        white_height: u32,
        /// Width of the black-background render.
        black_width: u32,
        /// Height of the black-background render.
        black_height: u32,
    },

    /// A matting input violated a precondition (e.g. zero-sized buffer).
    #[error("invalid matting input: {0}")]
    InvalidInput(String),

    /// The API returned a non-success HTTP status.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body, or the raw body.
        message: String,
    },

    /// An HTTP transport error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An inline image payload was not valid base64.
    #[error("failed to decode image payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// An error occurred during image processing (decode, encode, save).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The output format cannot store the result (e.g. no alpha channel).
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let unsupported = Error::UnsupportedFormat("jpeg".to_string());
        assert!(unsupported.to_string().contains("jpeg"));

        let mismatch = Error::ShapeMismatch {
            white_width: 2,
            white_height: 2,
            black_width: 3,
            black_height: 3,
        };
        let msg = mismatch.to_string();
        assert!(msg.contains("2x2"));
        assert!(msg.contains("3x3"));

        let exhausted = Error::ExhaustedRetries { attempts: 5 };
        assert!(exhausted.to_string().contains('5'));
    }

    #[test]
    fn missing_api_key_names_both_variables() {
        let msg = Error::MissingApiKey.to_string();
        assert!(msg.contains("GOOGLE_API_KEY"));
        assert!(msg.contains("GEMINI_API_KEY"));
    }
}
