use std::env;

/// Environment variable holding the Gemini API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Default Gemini model for the analyze (vision → text) call.
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-3-flash-preview";
/// Default Gemini model for the generate (text → image) call.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Runtime configuration for the gallery.
///
/// There is deliberately no configuration file: the only required value is
/// the Gemini API key, supplied through the process environment. The model
/// ids can be overridden the same way but rarely need to be.
///
/// # Loading
///
/// ```rust
/// use gallery_ai::config::Config;
///
/// // From the environment (GEMINI_API_KEY, optional model overrides)
/// let config = Config::from_env();
///
/// // Or construct directly
/// let config = Config::new("AIza...".to_string());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key. Empty when no credential is configured; both remote
    /// operations then fail fast with
    /// [`ApiError::MissingCredential`](crate::ai::ApiError::MissingCredential).
    pub api_key: String,
    /// Model id used for image analysis.
    pub analysis_model: String,
    /// Model id used for image generation.
    pub image_model: String,
}

impl Config {
    /// Build a config with the given API key and the default models.
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }

    /// Read configuration from the process environment.
    ///
    /// `GEMINI_API_KEY` supplies the credential; `GEMINI_ANALYSIS_MODEL`
    /// and `GEMINI_IMAGE_MODEL` override the model ids. A missing key is
    /// not an error here; the remote client reports it when a call is
    /// actually attempted.
    pub fn from_env() -> Self {
        let api_key = env::var(API_KEY_VAR).unwrap_or_default();
        if api_key.is_empty() {
            log::warn!("{API_KEY_VAR} is not set; remote calls will fail until it is");
        }

        let mut config = Self::new(api_key);
        if let Ok(model) = env::var("GEMINI_ANALYSIS_MODEL") {
            if !model.is_empty() {
                config.analysis_model = model;
            }
        }
        if let Ok(model) = env::var("GEMINI_IMAGE_MODEL") {
            if !model.is_empty() {
                config.image_model = model;
            }
        }
        config
    }

    /// Whether an API key is present.
    pub fn has_credential(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_models() {
        let config = Config::new("key".to_string());
        assert_eq!(config.analysis_model, DEFAULT_ANALYSIS_MODEL);
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert!(config.has_credential());
    }

    #[test]
    fn empty_key_has_no_credential() {
        let config = Config::new(String::new());
        assert!(!config.has_credential());
    }
}
