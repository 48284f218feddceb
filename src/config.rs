use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_LANGUAGE: &str = "hi-IN";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API key for the Gemini chat service
    pub gemini_api_key: Option<String>,

    /// Model to use for replies
    pub model: String,

    /// Default speech-capture language tag
    pub default_language: String,

    /// Advisor home directory (config + saved conversation)
    pub advisor_home: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        Config {
            gemini_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            default_language: DEFAULT_LANGUAGE.to_string(),
            advisor_home: home.join(".agri-advisor"),
        }
    }
}

impl Config {
    /// Load configuration from `~/.agri-advisor/config.toml`, creating the
    /// directory on first run.
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let advisor_home = home.join(".agri-advisor");
        let config_path = advisor_home.join("config.toml");

        fs::create_dir_all(&advisor_home)
            .context("Failed to create .agri-advisor directory")?;

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.advisor_home = advisor_home;
        if !config_path.exists() {
            config.save()?;
        }
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.advisor_home.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Get API key from config or environment
    pub fn api_key(&self) -> Option<String> {
        self.gemini_api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
    }

    /// Check if an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.gemini_api_key.is_some() || std::env::var("GEMINI_API_KEY").is_ok()
    }
}
