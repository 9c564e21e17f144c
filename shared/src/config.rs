use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_MODEL: &str = "AGROAI_MODEL";
pub const ENV_ENDPOINT: &str = "AGROAI_ENDPOINT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("neither API_KEY nor GEMINI_API_KEY is set")]
    MissingApiKey,

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct DiagnosisConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub api_key: Option<SecretString>,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            api_key: None,
        }
    }
}

impl DiagnosisConfig {
    /// Native shells: reads the key and optional overrides from the
    /// environment. `API_KEY` wins over `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = non_empty(ENV_API_KEY)
            .or_else(|| non_empty(ENV_GEMINI_API_KEY))
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::default().with_api_key(SecretString::new(api_key.trim().to_string()));
        if let Some(model) = non_empty(ENV_MODEL) {
            config = config.with_model(model)?;
        }
        if let Some(endpoint) = non_empty(ENV_ENDPOINT) {
            config = config.with_endpoint(endpoint)?;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Result<Self, ConfigError> {
        let model = model.into().trim().to_string();
        if model.is_empty()
            || !model
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(ConfigError::InvalidValue {
                name: ENV_MODEL,
                reason: format!("'{model}' is not a model id"),
            });
        }
        self.model = model;
        Ok(self)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Result<Self, ConfigError> {
        let endpoint = endpoint.into().trim().trim_end_matches('/').to_string();
        url::Url::parse(&endpoint).map_err(|e| ConfigError::InvalidValue {
            name: ENV_ENDPOINT,
            reason: e.to_string(),
        })?;
        self.endpoint = endpoint;
        Ok(self)
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().is_empty())
    }

    #[must_use]
    pub fn generate_content_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}
