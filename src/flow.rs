//! User-triggered flows: validate input, call the remote service, and
//! shape the result for the gallery. Remote errors stop here; each flow
//! converts them into user-visible text instead of propagating them.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::ai::{AiService, ApiError, AspectRatio, fetch_image};
use crate::gallery::{ImageRecord, Origin, data_url_mime};

/// Instruction sent with every analysis request.
pub const ANALYSIS_INSTRUCTION: &str = "Describe this image in detail.";

/// Description stored when analysis fails.
pub const ANALYSIS_FAILURE_TEXT: &str = "Failed to analyze image. Please try again.";

/// Message shown when generation fails.
pub const GENERATION_FAILURE_TEXT: &str =
    "Failed to generate image. Please check API key and try again.";

/// Longest generated-record title kept verbatim; longer prompts are
/// truncated with an ellipsis marker.
const TITLE_MAX_CHARS: usize = 30;

/// Lifecycle of a flow as the interface sees it. One field per flow;
/// `Pending` disables the triggering control.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed(String),
}

impl FlowState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Outcome of one generation request.
#[derive(Debug)]
pub enum GenerationOutcome {
    /// The prompt was empty or whitespace; nothing was sent.
    SkippedEmptyPrompt,
    /// A finished record, ready to insert at the gallery head.
    Generated(ImageRecord),
    /// The request failed; carries user-visible text.
    Failed(String),
}

/// Outcome of one analysis request.
#[derive(Debug)]
pub enum AnalysisOutcome {
    /// The record already had a description; no remote call was made.
    Cached(String),
    /// A fresh description from the backend.
    Fresh(String),
    /// The request failed; carries the fallback description text.
    Failed(String),
}

impl AnalysisOutcome {
    /// The text to show and store, whatever the outcome.
    pub fn text(&self) -> &str {
        match self {
            Self::Cached(t) | Self::Fresh(t) | Self::Failed(t) => t,
        }
    }
}

/// Generate an image from a prompt and wrap it into a gallery record.
///
/// An empty or whitespace-only prompt short-circuits without touching the
/// network. The record's title is the prompt truncated for display; its
/// description references the full prompt.
pub async fn generate_image(
    service: &dyn AiService,
    prompt: &str,
    aspect_ratio: AspectRatio,
) -> GenerationOutcome {
    if prompt.trim().is_empty() {
        log::debug!("Skipping generation: empty prompt");
        return GenerationOutcome::SkippedEmptyPrompt;
    }

    let backend = service.name();
    match service.generate(prompt, aspect_ratio).await {
        Ok(image) => {
            log::info!(
                "{backend} generated a {} image from a {}-char prompt",
                image.mime_type,
                prompt.chars().count()
            );
            let mut record = ImageRecord::from_encoded(
                truncate_title(prompt),
                &image.mime_type,
                image.data,
                Origin::Generated,
            );
            record.description = Some(format!("Generated from prompt: \"{prompt}\""));
            GenerationOutcome::Generated(record)
        }
        Err(e) => {
            log::warn!("Image generation via {backend} failed: {e}");
            GenerationOutcome::Failed(GENERATION_FAILURE_TEXT.to_string())
        }
    }
}

/// Produce a description for a record.
///
/// A record that already carries a description is returned as-is without
/// a remote call, unless `regenerate` is set; a regenerate always calls
/// out and may overwrite the cached text. Records without an embedded
/// payload have their bytes fetched from their URL first.
pub async fn analyze_record(
    service: &dyn AiService,
    record: &ImageRecord,
    regenerate: bool,
) -> AnalysisOutcome {
    if !regenerate {
        if let Some(text) = &record.description {
            log::debug!("Reusing cached description for record {}", record.id);
            return AnalysisOutcome::Cached(text.clone());
        }
    }

    let (payload, mime_type) = match encoded_payload(record).await {
        Ok(pair) => pair,
        Err(e) => {
            log::warn!("Could not obtain image bytes for record {}: {e}", record.id);
            return AnalysisOutcome::Failed(ANALYSIS_FAILURE_TEXT.to_string());
        }
    };

    let backend = service.name();
    match service.analyze(&payload, &mime_type, ANALYSIS_INSTRUCTION).await {
        Ok(text) => {
            log::debug!("{backend} described record {}", record.id);
            AnalysisOutcome::Fresh(text)
        }
        Err(e) => {
            log::warn!("Analysis via {backend} failed for record {}: {e}", record.id);
            AnalysisOutcome::Failed(ANALYSIS_FAILURE_TEXT.to_string())
        }
    }
}

/// Base64 payload and MIME type for a record: the embedded payload when
/// present, otherwise fetched from the record's URL.
async fn encoded_payload(record: &ImageRecord) -> Result<(String, String), ApiError> {
    if let Some(data) = &record.base64_data {
        let mime_type = data_url_mime(&record.url).unwrap_or("image/jpeg");
        return Ok((data.clone(), mime_type.to_string()));
    }
    let (bytes, mime_type) = fetch_image(&record.url).await?;
    Ok((STANDARD.encode(&bytes), mime_type))
}

fn truncate_title(prompt: &str) -> String {
    let mut chars = prompt.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::GeneratedImage;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubService {
        name_calls: AtomicUsize,
        analyze_calls: AtomicUsize,
        generate_calls: AtomicUsize,
        fail: bool,
        reply_text: String,
        seen: Mutex<Vec<(String, String)>>,
    }

    fn stub(reply_text: &str) -> StubService {
        StubService {
            reply_text: reply_text.to_string(),
            ..Default::default()
        }
    }

    fn failing_stub() -> StubService {
        StubService {
            fail: true,
            ..Default::default()
        }
    }

    #[async_trait::async_trait]
    impl AiService for StubService {
        fn name(&self) -> &str {
            self.name_calls.fetch_add(1, Ordering::SeqCst);
            "Stub"
        }

        async fn analyze(
            &self,
            _image_base64: &str,
            mime_type: &str,
            instruction: &str,
        ) -> Result<String, ApiError> {
            self.analyze_calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push((mime_type.to_string(), instruction.to_string()));
            if self.fail {
                return Err(ApiError::Api {
                    status: 500,
                    message: "backend unavailable".to_string(),
                });
            }
            Ok(self.reply_text.clone())
        }

        async fn generate(
            &self,
            _prompt: &str,
            _aspect_ratio: AspectRatio,
        ) -> Result<GeneratedImage, ApiError> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ApiError::Api {
                    status: 500,
                    message: "backend unavailable".to_string(),
                });
            }
            Ok(GeneratedImage {
                data: "AAAA".to_string(),
                mime_type: "image/png".to_string(),
            })
        }
    }

    fn uploaded_record() -> ImageRecord {
        ImageRecord::from_encoded(
            "tiny".to_string(),
            "image/png",
            "AAAA".to_string(),
            Origin::Upload,
        )
    }

    // ── generation ───────────────────────────────────────────────────

    #[tokio::test]
    async fn generation_builds_record_from_reply() {
        let service = stub("");
        let outcome = generate_image(&service, "a red apple", AspectRatio::Square).await;

        let record = match outcome {
            GenerationOutcome::Generated(record) => record,
            other => panic!("expected a generated record, got {other:?}"),
        };
        assert_eq!(record.title, "a red apple");
        assert_eq!(record.url, "data:image/png;base64,AAAA");
        assert_eq!(record.origin, Origin::Generated);
        assert_eq!(record.base64_data.as_deref(), Some("AAAA"));
        assert_eq!(
            record.description.as_deref(),
            Some("Generated from prompt: \"a red apple\"")
        );
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn generation_skips_empty_prompt() {
        let service = stub("");
        for prompt in ["", "   ", " \n\t "] {
            let outcome = generate_image(&service, prompt, AspectRatio::Square).await;
            assert!(matches!(outcome, GenerationOutcome::SkippedEmptyPrompt));
        }
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generation_truncates_long_titles() {
        let service = stub("");
        let prompt = "a very long and winding prompt about apples";
        let outcome = generate_image(&service, prompt, AspectRatio::Square).await;

        let record = match outcome {
            GenerationOutcome::Generated(record) => record,
            other => panic!("expected a generated record, got {other:?}"),
        };
        assert_eq!(record.title, "a very long and winding prompt...");
        // The description keeps the full prompt.
        assert_eq!(
            record.description.as_deref(),
            Some("Generated from prompt: \"a very long and winding prompt about apples\"")
        );
    }

    #[tokio::test]
    async fn generation_failure_reports_user_text() {
        let service = failing_stub();
        let outcome = generate_image(&service, "a red apple", AspectRatio::Square).await;
        match outcome {
            GenerationOutcome::Failed(text) => assert_eq!(text, GENERATION_FAILURE_TEXT),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn titles_truncate_on_chars_not_bytes() {
        assert_eq!(truncate_title("short"), "short");

        let exactly_thirty = "a very long and winding prompt";
        assert_eq!(exactly_thirty.chars().count(), 30);
        assert_eq!(truncate_title(exactly_thirty), exactly_thirty);

        let accented = "é".repeat(31);
        assert_eq!(truncate_title(&accented), format!("{}...", "é".repeat(30)));
    }

    // ── analysis ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn analysis_uses_embedded_payload() {
        let service = stub("A single pixel on a dark field.");
        let record = uploaded_record();

        let outcome = analyze_record(&service, &record, false).await;
        match outcome {
            AnalysisOutcome::Fresh(text) => assert_eq!(text, "A single pixel on a dark field."),
            other => panic!("expected fresh text, got {other:?}"),
        }
        assert_eq!(service.analyze_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *service.seen.lock().unwrap(),
            vec![("image/png".to_string(), ANALYSIS_INSTRUCTION.to_string())]
        );
    }

    #[tokio::test]
    async fn analysis_short_circuits_on_cached_description() {
        let service = stub("new text");
        let mut record = uploaded_record();
        record.description = Some("cached text".to_string());

        let outcome = analyze_record(&service, &record, false).await;
        match outcome {
            AnalysisOutcome::Cached(text) => assert_eq!(text, "cached text"),
            other => panic!("expected cached text, got {other:?}"),
        }
        assert_eq!(service.analyze_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn regenerate_bypasses_cache() {
        let service = stub("new text");
        let mut record = uploaded_record();
        record.description = Some("cached text".to_string());

        let outcome = analyze_record(&service, &record, true).await;
        match outcome {
            AnalysisOutcome::Fresh(text) => assert_eq!(text, "new text"),
            other => panic!("expected fresh text, got {other:?}"),
        }
        assert_eq!(service.analyze_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn analysis_failure_yields_fallback_text() {
        let service = failing_stub();
        let record = uploaded_record();

        let outcome = analyze_record(&service, &record, false).await;
        match outcome {
            AnalysisOutcome::Failed(text) => assert_eq!(text, ANALYSIS_FAILURE_TEXT),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn flows_report_which_service_ran() {
        let service = stub("a quiet field");

        generate_image(&service, "a red apple", AspectRatio::Square).await;
        assert_eq!(service.name_calls.load(Ordering::SeqCst), 1);

        analyze_record(&service, &uploaded_record(), false).await;
        assert_eq!(service.name_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn outcome_text_covers_all_variants() {
        assert_eq!(AnalysisOutcome::Cached("a".into()).text(), "a");
        assert_eq!(AnalysisOutcome::Fresh("b".into()).text(), "b");
        assert_eq!(AnalysisOutcome::Failed("c".into()).text(), "c");
    }

    #[test]
    fn flow_state_defaults_to_idle() {
        assert_eq!(FlowState::default(), FlowState::Idle);
        assert!(FlowState::Pending.is_pending());
        assert!(!FlowState::Idle.is_pending());
    }
}
