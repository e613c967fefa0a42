//! Gemini model client: typed requests, typed response decoding.
//!
//! The controller never probes raw response fields; every response is
//! decoded into a [`ResponsePayload`] variant first, and the controller
//! matches on that.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default image-generation model.
pub const DEFAULT_MODEL: &str = "gemini-3-pro-image-preview";

/// Base URL of the Gemini REST API.
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Aspect ratio of a generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    /// 1:1
    Square,
    /// 2:3
    TwoThree,
    /// 3:2
    ThreeTwo,
    /// 3:4
    ThreeFour,
    /// 4:3
    FourThree,
    /// 4:5
    FourFive,
    /// 5:4
    FiveFour,
    /// 9:16
    NineSixteen,
    /// 16:9
    SixteenNine,
    /// 21:9
    TwentyOneNine,
}

impl AspectRatio {
    /// The wire representation, e.g. `"16:9"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::TwoThree => "2:3",
            Self::ThreeTwo => "3:2",
            Self::ThreeFour => "3:4",
            Self::FourThree => "4:3",
            Self::FourFive => "4:5",
            Self::FiveFour => "5:4",
            Self::NineSixteen => "9:16",
            Self::SixteenNine => "16:9",
            Self::TwentyOneNine => "21:9",
        }
    }
}

impl std::str::FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "1:1" => Ok(Self::Square),
            "2:3" => Ok(Self::TwoThree),
            "3:2" => Ok(Self::ThreeTwo),
            "3:4" => Ok(Self::ThreeFour),
            "4:3" => Ok(Self::FourThree),
            "4:5" => Ok(Self::FourFive),
            "5:4" => Ok(Self::FiveFour),
            "9:16" => Ok(Self::NineSixteen),
            "16:9" => Ok(Self::SixteenNine),
            "21:9" => Ok(Self::TwentyOneNine),
            other => Err(format!(
                "unknown aspect ratio '{other}' (expected one of 1:1, 2:3, 3:2, \
                 3:4, 4:3, 4:5, 5:4, 9:16, 16:9, 21:9)"
            )),
        }
    }
}

/// Resolution tier of a generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    /// ~1024px on the long edge.
    OneK,
    /// ~2048px on the long edge.
    TwoK,
    /// ~4096px on the long edge.
    FourK,
}

impl ImageSize {
    /// The wire representation, e.g. `"2K"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

impl std::str::FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "1K" | "1k" => Ok(Self::OneK),
            "2K" | "2k" => Ok(Self::TwoK),
            "4K" | "4k" => Ok(Self::FourK),
            other => Err(format!("unknown size '{other}' (expected 1K, 2K or 4K)")),
        }
    }
}

/// A single generation or edit request. Immutable once built.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Prompt text sent to the model.
    pub prompt: String,
    /// Encoded reference image for edit requests (PNG bytes).
    pub reference_image: Option<Vec<u8>>,
    /// Requested aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Requested resolution tier.
    pub image_size: ImageSize,
    /// Model identifier.
    pub model: String,
}

impl GenerationRequest {
    /// Build a fresh render request.
    #[must_use]
    pub fn new(
        prompt: impl Into<String>,
        aspect_ratio: AspectRatio,
        image_size: ImageSize,
        model: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            reference_image: None,
            aspect_ratio,
            image_size,
            model: model.into(),
        }
    }

    /// Attach a reference image, turning this into an edit request.
    #[must_use]
    pub fn with_reference_image(mut self, png_bytes: Vec<u8>) -> Self {
        self.reference_image = Some(png_bytes);
        self
    }
}

/// Decoded model response: what came back, nothing more.
#[derive(Debug)]
pub enum ResponsePayload {
    /// The first inline image payload, decoded from base64.
    Image(Vec<u8>),
    /// No image, but the model returned text.
    Text(String),
    /// Neither image nor text.
    Empty,
}

/// The seam between the acquisition pipeline and the model provider.
pub trait ModelClient {
    /// Submit one generation or edit request and decode the response.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success API status, or
    /// an undecodable payload. An image-free response is *not* an error
    /// here; it decodes to [`ResponsePayload::Text`] or
    /// [`ResponsePayload::Empty`] and the caller decides what that means.
    fn generate(&self, request: &GenerationRequest) -> Result<ResponsePayload>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    contents: Vec<WireContent<'a>>,
    generation_config: WireGenerationConfig<'a>,
}

#[derive(Serialize)]
struct WireContent<'a> {
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePart<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<WireInlineData<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireInlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig<'a> {
    response_modalities: &'a [&'a str],
    image_config: WireImageConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireImageConfig<'a> {
    aspect_ratio: &'a str,
    image_size: &'a str,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Deserialize)]
struct WireCandidate {
    content: Option<WireCandidateContent>,
}

#[derive(Deserialize)]
struct WireCandidateContent {
    #[serde(default)]
    parts: Vec<WireResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponsePart {
    text: Option<String>,
    inline_data: Option<WireResponseInlineData>,
}

#[derive(Deserialize)]
struct WireResponseInlineData {
    data: String,
}

#[derive(Deserialize)]
struct WireErrorBody {
    error: Option<WireErrorDetail>,
}

#[derive(Deserialize)]
struct WireErrorDetail {
    message: String,
}

/// Decode a parsed response into a payload variant.
///
/// The first inline image part wins; failing that, the first text part;
/// failing that, [`ResponsePayload::Empty`].
fn decode_payload(response: WireResponse) -> Result<ResponsePayload> {
    let parts = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts);

    let mut text = None;
    for part in parts {
        if let Some(inline) = part.inline_data {
            let bytes = BASE64_STANDARD.decode(inline.data)?;
            return Ok(ResponsePayload::Image(bytes));
        }
        if text.is_none() {
            text = part.text;
        }
    }

    Ok(match text {
        Some(t) => ResponsePayload::Text(t),
        None => ResponsePayload::Empty,
    })
}

/// Resolve the API key from the environment.
///
/// Loads a `.env` file first if one is present (best-effort), then checks
/// `GOOGLE_API_KEY` followed by `GEMINI_API_KEY`.
///
/// # Errors
///
/// Returns [`Error::MissingApiKey`] if neither variable is set.
pub fn resolve_api_key() -> Result<String> {
    let _ = dotenvy::dotenv();
    std::env::var("GOOGLE_API_KEY")
        .or_else(|_| std::env::var("GEMINI_API_KEY"))
        .map_err(|_| Error::MissingApiKey)
}

/// Blocking client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    api_key: String,
}

impl GeminiClient {
    /// Create a client with credentials resolved from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingApiKey`] if no key is configured.
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_api_key(resolve_api_key()?))
    }

    /// Create a client with an explicit API key.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            api_key: api_key.into(),
        }
    }

    fn build_body(request: &GenerationRequest) -> WireRequest<'_> {
        let mut parts = Vec::with_capacity(2);
        if let Some(png) = &request.reference_image {
            parts.push(WirePart {
                text: None,
                inline_data: Some(WireInlineData {
                    mime_type: "image/png",
                    data: BASE64_STANDARD.encode(png),
                }),
            });
        }
        parts.push(WirePart {
            text: Some(&request.prompt),
            inline_data: None,
        });

        // Edits also return text explaining the change; fresh renders only
        // need the image modality.
        let modalities: &[&str] = if request.reference_image.is_some() {
            &["TEXT", "IMAGE"]
        } else {
            &["IMAGE"]
        };

        WireRequest {
            contents: vec![WireContent { parts }],
            generation_config: WireGenerationConfig {
                response_modalities: modalities,
                image_config: WireImageConfig {
                    aspect_ratio: request.aspect_ratio.as_str(),
                    image_size: request.image_size.as_str(),
                },
            },
        }
    }
}

impl ModelClient for GeminiClient {
    fn generate(&self, request: &GenerationRequest) -> Result<ResponsePayload> {
        let url = format!("{API_BASE}/models/{}:generateContent", request.model);
        let body = Self::build_body(request);

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().unwrap_or_default();
            let message = serde_json::from_str::<WireErrorBody>(&raw)
                .ok()
                .and_then(|b| b.error)
                .map_or(raw, |e| e.message);
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        decode_payload(response.json::<WireResponse>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_round_trips_every_variant() {
        for s in [
            "1:1", "2:3", "3:2", "3:4", "4:3", "4:5", "5:4", "9:16", "16:9", "21:9",
        ] {
            let ratio: AspectRatio = s.parse().unwrap();
            assert_eq!(ratio.as_str(), s);
        }
    }

    #[test]
    fn aspect_ratio_rejects_unknown_values() {
        assert!("16:10".parse::<AspectRatio>().is_err());
        assert!("".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn image_size_parses_case_insensitively() {
        assert_eq!("1K".parse::<ImageSize>().unwrap(), ImageSize::OneK);
        assert_eq!("2k".parse::<ImageSize>().unwrap(), ImageSize::TwoK);
        assert_eq!("4K".parse::<ImageSize>().unwrap(), ImageSize::FourK);
        assert!("8K".parse::<ImageSize>().is_err());
    }

    #[test]
    fn decode_payload_prefers_first_inline_image() {
        let json = format!(
            r#"{{"candidates":[{{"content":{{"parts":[
                {{"text":"here you go"}},
                {{"inlineData":{{"mimeType":"image/png","data":"{}"}}}},
                {{"inlineData":{{"mimeType":"image/png","data":"QUJD"}}}}
            ]}}}}]}}"#,
            BASE64_STANDARD.encode(b"first")
        );
        let wire: WireResponse = serde_json::from_str(&json).unwrap();
        match decode_payload(wire).unwrap() {
            ResponsePayload::Image(bytes) => assert_eq!(bytes, b"first"),
            other => panic!("expected image payload, got {other:?}"),
        }
    }

    #[test]
    fn decode_payload_falls_back_to_text() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"no image today"}]}}]}"#;
        let wire: WireResponse = serde_json::from_str(json).unwrap();
        match decode_payload(wire).unwrap() {
            ResponsePayload::Text(t) => assert_eq!(t, "no image today"),
            other => panic!("expected text payload, got {other:?}"),
        }
    }

    #[test]
    fn decode_payload_empty_when_nothing_usable() {
        let wire: WireResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(
            decode_payload(wire).unwrap(),
            ResponsePayload::Empty
        ));

        let wire: WireResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            decode_payload(wire).unwrap(),
            ResponsePayload::Empty
        ));
    }

    #[test]
    fn decode_payload_reports_bad_base64() {
        let json = r#"{"candidates":[{"content":{"parts":[
            {"inlineData":{"mimeType":"image/png","data":"not-base64!!"}}
        ]}}]}"#;
        let wire: WireResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            decode_payload(wire),
            Err(crate::error::Error::Base64(_))
        ));
    }

    #[test]
    fn request_body_carries_image_config() {
        let request = GenerationRequest::new(
            "a banana sticker",
            AspectRatio::SixteenNine,
            ImageSize::FourK,
            DEFAULT_MODEL,
        );
        let body = GeminiClient::build_body(&request);
        let json = serde_json::to_string(&body).unwrap();

        assert!(json.contains(r#""aspectRatio":"16:9""#));
        assert!(json.contains(r#""imageSize":"4K""#));
        assert!(json.contains(r#""responseModalities":["IMAGE"]"#));
        assert!(json.contains("a banana sticker"));
        assert!(!json.contains("inlineData"));
    }

    #[test]
    fn edit_request_body_carries_reference_image_and_text_modality() {
        let request = GenerationRequest::new(
            "blacken the background",
            AspectRatio::Square,
            ImageSize::TwoK,
            DEFAULT_MODEL,
        )
        .with_reference_image(b"png-bytes".to_vec());
        let body = GeminiClient::build_body(&request);
        let json = serde_json::to_string(&body).unwrap();

        assert!(json.contains(r#""responseModalities":["TEXT","IMAGE"]"#));
        assert!(json.contains(r#""mimeType":"image/png""#));
        assert!(json.contains(&BASE64_STANDARD.encode(b"png-bytes")));
        // Reference image comes before the instruction text.
        assert!(json.find("inlineData").unwrap() < json.find("blacken").unwrap());
    }
}
