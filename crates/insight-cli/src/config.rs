use insight_client::gemini::DEFAULT_BASE_URL;
use insight_client::kakao::DEFAULT_KAKAO_BASE_URL;
use insight_core::analysis::{DEFAULT_MODEL, DEFAULT_PROMPT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// On-disk configuration. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub api_base_url: Option<String>,
    pub prompt: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub download_dir: Option<PathBuf>,
    pub share_command: Option<String>,
    pub share_url: Option<String>,
    pub kakao_access_token: Option<String>,
    pub kakao_api_base_url: Option<String>,
}

/// Application configuration: config file, then `FACE_INSIGHT_*` environment overrides.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini credential. Absence is reported when an analysis is attempted.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
    /// Instruction sent with every image.
    pub prompt: String,
    pub request_timeout_secs: u64,
    /// Where `download` writes `ai_face_analysis.txt`.
    pub download_dir: PathBuf,
    /// Share command line; `termux-share` is detected when unset.
    pub share_command: Option<String>,
    /// URL attached to shares.
    pub share_url: Option<String>,
    /// Kakao user OAuth access token for the memo API. Missing or placeholder
    /// hides Kakao share. An app (JavaScript or REST) key is not accepted by the API.
    pub kakao_access_token: Option<String>,
    pub kakao_api_base_url: String,
}

impl Config {
    /// Load from `path`, or from the default location when it exists, then apply the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => read_file(p)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(p) => read_file(&p)?,
                None => FileConfig::default(),
            },
        };
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    /// Merge a file config with environment lookups. Environment wins.
    pub fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let env_str = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let api_key = env_str("API_KEY")
            .or_else(|| env_str("GEMINI_API_KEY"))
            .or(file.api_key);

        let download_dir = env_str("FACE_INSIGHT_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .or(file.download_dir)
            .unwrap_or_else(|| default_download_dir(&env));

        Self {
            api_key,
            model: env_str("FACE_INSIGHT_MODEL")
                .or(file.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base_url: env_str("FACE_INSIGHT_API_BASE_URL")
                .or(file.api_base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            prompt: env_str("FACE_INSIGHT_PROMPT")
                .or(file.prompt)
                .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            request_timeout_secs: env_u64(&env, "FACE_INSIGHT_TIMEOUT_SECS")
                .or(file.request_timeout_secs)
                .unwrap_or(60),
            download_dir,
            share_command: env_str("FACE_INSIGHT_SHARE_COMMAND").or(file.share_command),
            share_url: env_str("FACE_INSIGHT_SHARE_URL").or(file.share_url),
            kakao_access_token: env_str("FACE_INSIGHT_KAKAO_ACCESS_TOKEN")
                .or(file.kakao_access_token),
            kakao_api_base_url: env_str("FACE_INSIGHT_KAKAO_API_BASE_URL")
                .or(file.kakao_api_base_url)
                .unwrap_or_else(|| DEFAULT_KAKAO_BASE_URL.to_string()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// `$XDG_CONFIG_HOME/face-insight/config.toml`, falling back to `~/.config`.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;
    Some(base.join("face-insight").join("config.toml"))
}

fn default_download_dir(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    env("HOME")
        .map(|home| PathBuf::from(home).join("Downloads"))
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn env_u64(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    env(key).and_then(|v| v.trim().parse().ok())
}
