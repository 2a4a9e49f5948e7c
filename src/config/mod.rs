use crate::consts::*;
use anyhow::{Context, Result};
use clap::ValueEnum;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Interpreter to inspect; `None` searches `python3` then `python`.
    pub python: Option<String>,
    pub nvcc: String,
    pub nvidia_smi: String,
    /// Per-subprocess limit, 0 disables it.
    pub probe_timeout_secs: u64,
    pub format: OutputFormat,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            python: None,
            nvcc: NVCC_PROGRAM.to_string(),
            nvidia_smi: NVIDIA_SMI_PROGRAM.to_string(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            format: OutputFormat::default(),
        }
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
    config: ReporterConfig,
}

impl ConfigManager {
    /// Loads from the user config directory.
    pub fn new() -> Result<Self> {
        let config_dir = config_dir().context("无法获取配置目录")?;
        Self::from_path(config_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Layers defaults, the file at `config_path` if it exists, then
    /// `ENVREPORT_*` environment variables.
    pub fn from_path(config_path: PathBuf) -> Result<Self> {
        Self::with_environment(config_path, config::Environment::with_prefix(ENV_PREFIX))
    }

    fn with_environment(config_path: PathBuf, environment: config::Environment) -> Result<Self> {
        log::info!("Loading configuration from {}", config_path.display());

        // save() 总是写 JSON，不按扩展名猜格式
        let file = config::File::from(config_path.as_path())
            .format(config::FileFormat::Json)
            .required(false);

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(environment.try_parsing(true))
            .build()
            .with_context(|| format!("无法读取配置文件 {}", config_path.display()))?;

        let config: ReporterConfig = settings
            .try_deserialize()
            .with_context(|| format!("配置格式错误 {}", config_path.display()))?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Loads `config_path` with `vars` standing in for the process environment.
    #[cfg(test)]
    pub fn with_vars(config_path: PathBuf, vars: &[(&str, &str)]) -> Result<Self> {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::with_environment(
            config_path,
            config::Environment::with_prefix(ENV_PREFIX).source(Some(vars)),
        )
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    pub fn get_config(&self) -> &ReporterConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_vars(dir.path().join("config.json"), &[]).unwrap();
        assert_eq!(manager.get_config(), &ReporterConfig::default());
        assert_eq!(manager.get_config().nvcc, "nvcc");
        assert_eq!(manager.get_config().probe_timeout_secs, DEFAULT_PROBE_TIMEOUT_SECS);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"python": "/opt/venv/bin/python", "nvcc": "/usr/local/cuda/bin/nvcc", "format": "json"}"#,
        )
        .unwrap();

        let manager = ConfigManager::with_vars(path, &[]).unwrap();
        let config = manager.get_config();
        assert_eq!(config.python.as_deref(), Some("/opt/venv/bin/python"));
        assert_eq!(config.nvcc, "/usr/local/cuda/bin/nvcc");
        assert_eq!(config.nvidia_smi, "nvidia-smi");
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"nvidia_smi": "/usr/bin/nvidia-smi", "probe_timeout_secs": 60}"#)
            .unwrap();

        let manager = ConfigManager::with_vars(
            path,
            &[
                ("ENVREPORT_NVIDIA_SMI", "/opt/smi"),
                ("ENVREPORT_PROBE_TIMEOUT_SECS", "5"),
                ("UNRELATED_NVCC", "/nope"),
            ],
        )
        .unwrap();
        let config = manager.get_config();
        assert_eq!(config.nvidia_smi, "/opt/smi");
        assert_eq!(config.probe_timeout_secs, 5);
        assert_eq!(config.nvcc, "nvcc");
    }

    #[test]
    fn save_round_trips_through_loader() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let manager = ConfigManager::with_vars(path.clone(), &[]).unwrap();
        manager.save().unwrap();

        assert!(path.exists());
        let reloaded = ConfigManager::with_vars(path, &[]).unwrap();
        assert_eq!(reloaded.get_config(), manager.get_config());
    }

    #[test]
    fn saved_file_reloads_whatever_its_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("envreport.toml");
        std::fs::write(&path, r#"{"nvcc": "/usr/local/cuda-12.4/bin/nvcc"}"#).unwrap();

        let manager = ConfigManager::with_vars(path.clone(), &[]).unwrap();
        assert_eq!(manager.get_config().nvcc, "/usr/local/cuda-12.4/bin/nvcc");
        manager.save().unwrap();

        let reloaded = ConfigManager::with_vars(path, &[]).unwrap();
        assert_eq!(reloaded.get_config(), manager.get_config());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(ConfigManager::with_vars(path, &[]).is_err());
    }
}
