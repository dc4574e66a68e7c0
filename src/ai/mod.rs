//! Remote AI boundary: the [`AiService`] trait plus the error and payload
//! types shared by its implementations.

pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the remote AI boundary. Flows catch these and convert them
/// to user-visible text; they never propagate past the flow layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No API key is configured. Both operations fail with this before
    /// any network attempt.
    #[error("no API key configured (set {var})", var = crate::config::API_KEY_VAR)]
    MissingCredential,

    /// Transport or decoding failure talking to the backend.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// A generation response carried no image part.
    #[error("no image data found in response")]
    NoImage,
}

/// The aspect ratios the generation endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Square,
    Portrait3x4,
    Landscape4x3,
    Portrait9x16,
    Landscape16x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape16x9,
    ];

    /// The wire form the backend expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait3x4 => "3:4",
            Self::Landscape4x3 => "4:3",
            Self::Portrait9x16 => "9:16",
            Self::Landscape16x9 => "16:9",
        }
    }
}

/// Payload returned by a successful image generation.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// Bare base64 image payload.
    pub data: String,
    /// MIME type reported by the backend.
    pub mime_type: String,
}

/// A remote generative-AI backend.
///
/// Both operations are single-shot: no retries, no timeouts, no
/// streaming. Implementations must fail with
/// [`ApiError::MissingCredential`] before touching the network when no
/// key is configured.
#[async_trait]
pub trait AiService: Send + Sync {
    /// Service name, for logs and window chrome.
    fn name(&self) -> &str;

    /// Describe an image. `image_base64` is the bare payload (no data-URL
    /// prefix) and `instruction` the text sent alongside it.
    async fn analyze(
        &self,
        image_base64: &str,
        mime_type: &str,
        instruction: &str,
    ) -> Result<String, ApiError>;

    /// Generate an image from a text prompt.
    async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<GeneratedImage, ApiError>;
}

/// Fetch a remote image's raw bytes and MIME type, for records that only
/// carry a URL. The MIME type comes from the `Content-Type` header and
/// falls back to `image/jpeg` when the server omits it.
pub async fn fetch_image(url: &str) -> Result<(Vec<u8>, String), ApiError> {
    log::debug!("Fetching image bytes from {url}");
    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(ApiError::Api {
            status: response.status().as_u16(),
            message: format!("while fetching {url}"),
        });
    }

    let mime_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| "image/jpeg".to_string());

    Ok((response.bytes().await?.to_vec(), mime_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_wire_forms() {
        assert_eq!(AspectRatio::Square.as_str(), "1:1");
        assert_eq!(AspectRatio::Portrait3x4.as_str(), "3:4");
        assert_eq!(AspectRatio::Landscape4x3.as_str(), "4:3");
        assert_eq!(AspectRatio::Portrait9x16.as_str(), "9:16");
        assert_eq!(AspectRatio::Landscape16x9.as_str(), "16:9");
    }

    #[test]
    fn default_aspect_ratio_is_square() {
        assert_eq!(AspectRatio::default(), AspectRatio::Square);
    }

    #[test]
    fn all_lists_every_ratio_once() {
        assert_eq!(AspectRatio::ALL.len(), 5);
        for (i, a) in AspectRatio::ALL.iter().enumerate() {
            assert!(AspectRatio::ALL[i + 1..].iter().all(|b| b != a));
        }
    }

    #[test]
    fn missing_credential_names_the_env_var() {
        let message = ApiError::MissingCredential.to_string();
        assert!(message.contains("GEMINI_API_KEY"));
    }
}
