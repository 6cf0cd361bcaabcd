use serde::Deserialize;

use crate::error::{AppError, Result};

#[derive(Deserialize, Clone)]
pub struct AppConfig {
    /// Emergence orchestrator API key. Optional: without it, workflow
    /// queries degrade to an advisory message instead of failing startup.
    pub emergence_api_key: Option<String>,
    #[serde(default = "default_emergence_base_url")]
    pub emergence_base_url: String,
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_openai_temperature")]
    pub openai_temperature: f32,
    /// How many tool-execution rounds the assistant may take before the
    /// conversation is cut off.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
}

// Manual Debug impl to avoid leaking the API keys
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "emergence_api_key",
                &self.emergence_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("emergence_base_url", &self.emergence_base_url)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("openai_model", &self.openai_model)
            .field("openai_temperature", &self.openai_temperature)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .finish()
    }
}

fn default_emergence_base_url() -> String {
    "https://api.emergence.ai/v0/orchestrators/em-orchestrator/workflows".to_string()
}

fn default_openai_model() -> String {
    "gpt-4".to_string()
}

fn default_openai_temperature() -> f32 {
    0.7
}

fn default_max_tool_rounds() -> u32 {
    2
}

impl AppConfig {
    /// Load configuration from an optional file plus the process
    /// environment. Environment variables use the unprefixed names the
    /// service documents: `EMERGENCE_API_KEY`, `OPENAI_API_KEY`,
    /// `OPENAI_MODEL`, `OPENAI_TEMPERATURE`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            // Try default paths
            builder =
                builder.add_source(config::File::with_name("emergence-agent").required(false));
        }

        // Environment variable overrides, unprefixed so the documented
        // variable names map straight onto the fields above
        builder = builder.add_source(config::Environment::default().try_parsing(true));

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }
}
