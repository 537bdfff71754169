use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACELAB_CONFIG_PATH").unwrap_or("/usr/local/etc/facelab/config.toml"))
});

pub static DEFAULT_MODEL_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(
        option_env!("FACELAB_MODEL_PATH").unwrap_or("/usr/local/share/facelab/face_landmark.onnx"),
    )
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub camera: String,
    /// Path to the face landmark ONNX model.
    pub model: PathBuf,
    /// Minimum model confidence before a frame counts as containing a face.
    pub min_confidence: f32,
    /// Listen address for the assessment relay server.
    pub listen: String,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: "/dev/video0".to_string(),
            model: DEFAULT_MODEL_PATH.to_path_buf(),
            min_confidence: 0.5,
            listen: "127.0.0.1:8088".to_string(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            api_key: String::new(),
            model: "claude-3-sonnet-20240229".to_string(),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
