use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::transcript::HISTORY_KEY;

/// Default Ollama generate endpoint.
pub const DEFAULT_URL: &str = "http://localhost:11434/api/generate";
/// Default model name.
pub const DEFAULT_MODEL: &str = "phi4:latest";

/// Runtime settings, read from an optional TOML file.
///
/// ```toml
/// url = "http://localhost:11434/api/generate"
/// model = "phi4:latest"
/// data_dir = "/home/me/.local/share/said"
/// history_key = "conversationHistory"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Full URL of the generate endpoint.
    pub url: String,
    /// Model name sent with every request.
    pub model: String,
    /// Directory holding the stored transcript.
    pub data_dir: PathBuf,
    /// Storage key of the transcript.
    pub history_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            model: DEFAULT_MODEL.into(),
            data_dir: default_data_dir(),
            history_key: HISTORY_KEY.into(),
        }
    }
}

/// Platform data directory, or `.said` in the working directory when the
/// platform has none.
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "said")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".said"))
}

impl Config {
    /// Load a [`Config`] from a TOML file. Missing fields keep their defaults.
    pub async fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Ok(toml::from_str(&text)?)
    }
}
