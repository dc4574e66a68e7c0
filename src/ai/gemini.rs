use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{AiService, ApiError, AspectRatio, GeneratedImage};
use crate::config::Config;

/// Text used when analysis succeeds but the reply carries no text part.
const DEFAULT_DESCRIPTION: &str = "No description generated.";

/// Client for the Gemini `generateContent` endpoint, covering both the
/// vision (analysis) and image-generation models.
pub struct GeminiService {
    api_key: String,
    analysis_model: String,
    image_model: String,
    client: Client,
}

impl GeminiService {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            analysis_model: config.analysis_model.clone(),
            image_model: config.image_model.clone(),
            client: Client::new(),
        }
    }

    /// POST a `generateContent` body to one of the configured models and
    /// decode the reply. Fails fast without a network attempt when no API
    /// key is configured.
    async fn generate_content(
        &self,
        model: &str,
        body: serde_json::Value,
    ) -> Result<GenerateContentResponse, ApiError> {
        if self.api_key.is_empty() {
            return Err(ApiError::MissingCredential);
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            model, self.api_key
        );

        let resp = self.client.post(&url).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        Ok(resp.json().await?)
    }
}

#[async_trait::async_trait]
impl AiService for GeminiService {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn analyze(
        &self,
        image_base64: &str,
        mime_type: &str,
        instruction: &str,
    ) -> Result<String, ApiError> {
        log::debug!("Requesting analysis from {}", self.analysis_model);

        let body = json!({
            "contents": [
                {
                    "parts": [
                        {
                            "inline_data": {
                                "mime_type": mime_type,
                                "data": image_base64
                            }
                        },
                        { "text": instruction }
                    ]
                }
            ]
        });

        let reply = self.generate_content(&self.analysis_model, body).await?;
        Ok(reply
            .first_text()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()))
    }

    async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<GeneratedImage, ApiError> {
        log::info!("Requesting image generation from {}", self.image_model);

        let body = json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ],
            "generationConfig": {
                "imageConfig": {
                    "aspectRatio": aspect_ratio.as_str()
                }
            }
        });

        let reply = self.generate_content(&self.image_model, body).await?;
        reply.first_image().ok_or(ApiError::NoImage)
    }
}

// Reply shape for `generateContent`, reduced to the fields we read. The
// backend sends camelCase keys; unknown fields are ignored.

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter())
            .into_iter()
            .flatten()
    }

    /// First non-empty text part of the first candidate.
    fn first_text(&self) -> Option<String> {
        self.parts()
            .filter_map(|part| part.text.as_deref())
            .find(|text| !text.trim().is_empty())
            .map(str::to_string)
    }

    /// First inline image of the first candidate. A part without a MIME
    /// type defaults to `image/png`.
    fn first_image(&self) -> Option<GeneratedImage> {
        self.parts()
            .find_map(|part| part.inline_data.as_ref())
            .map(|inline| GeneratedImage {
                data: inline.data.clone(),
                mime_type: inline
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| "image/png".to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_without_key() -> GeminiService {
        GeminiService::new(&Config::new(String::new()))
    }

    #[test]
    fn service_reports_its_name() {
        assert_eq!(service_without_key().name(), "Gemini");
    }

    // ── credential fail-fast ─────────────────────────────────────────

    #[tokio::test]
    async fn analyze_without_key_fails_before_any_request() {
        let err = service_without_key()
            .analyze("AAAA", "image/png", "Describe this image in detail.")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingCredential));
    }

    #[tokio::test]
    async fn generate_without_key_fails_before_any_request() {
        let err = service_without_key()
            .generate("a red apple", AspectRatio::Square)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingCredential));
    }

    // ── reply decoding ───────────────────────────────────────────────

    #[test]
    fn decodes_text_reply() {
        let reply: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {
                        "parts": [{ "text": "A foggy pine forest at dawn." }],
                        "role": "model"
                    },
                    "finishReason": "STOP"
                }],
                "modelVersion": "gemini-3-flash-preview"
            }"#,
        )
        .unwrap();
        assert_eq!(
            reply.first_text().as_deref(),
            Some("A foggy pine forest at dawn.")
        );
        assert!(reply.first_image().is_none());
    }

    #[test]
    fn decodes_image_reply() {
        let reply: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {
                        "parts": [
                            { "text": "Here you go." },
                            { "inlineData": { "mimeType": "image/webp", "data": "AAAA" } }
                        ]
                    }
                }]
            }"#,
        )
        .unwrap();
        let image = reply.first_image().unwrap();
        assert_eq!(image.data, "AAAA");
        assert_eq!(image.mime_type, "image/webp");
    }

    #[test]
    fn image_mime_type_defaults_to_png() {
        let reply: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": { "parts": [{ "inlineData": { "data": "AAAA" } }] }
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(reply.first_image().unwrap().mime_type, "image/png");
    }

    #[test]
    fn empty_reply_has_no_text_or_image() {
        let reply: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(reply.first_text().is_none());
        assert!(reply.first_image().is_none());
    }

    #[test]
    fn whitespace_text_counts_as_empty() {
        let reply: GenerateContentResponse = serde_json::from_str(
            r#"{ "candidates": [{ "content": { "parts": [{ "text": "  \n" }] } }] }"#,
        )
        .unwrap();
        assert!(reply.first_text().is_none());
    }
}
