use crate::consts::*;
use crate::device::{EnvironmentInfo, ProbeDetails};
use crate::model::{ImageSize, ModelConfig};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("no model configuration supplied; pass --model <PATH>")]
    MissingModel,
    #[error("无法读取模型配置 {path}: {reason}")]
    ModelConfigRead { path: PathBuf, reason: String },
    #[error("模型配置不是有效的 JSON {path}: {reason}")]
    ModelConfigParse { path: PathBuf, reason: String },
    #[error("invalid image size {0:?}, expected WIDTHxHEIGHT")]
    InvalidImageSize(String),
    #[error("无法读取错误日志 {path}: {reason}")]
    ErrorLogRead { path: PathBuf, reason: String },
    #[error("序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AdditionalInfo {
    pub image_size: Option<ImageSize>,
    pub cuda_visible_devices: Option<String>,
}

/// Everything that goes into one bug report.
#[derive(Debug, Clone, Serialize)]
pub struct IssueReport {
    pub generated_at: DateTime<Utc>,
    pub environment: EnvironmentInfo,
    pub probes: ProbeDetails,
    pub model_config: ModelConfig,
    pub additional: AdditionalInfo,
    pub error_log: Option<String>,
}

impl IssueReport {
    pub fn new(
        environment: EnvironmentInfo,
        probes: ProbeDetails,
        model_config: ModelConfig,
        additional: AdditionalInfo,
        error_log: Option<String>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            environment,
            probes,
            model_config,
            additional,
            error_log,
        }
    }

    pub fn render_markdown(&self) -> Result<String, ReportError> {
        let mut out = render_environment(&self.environment);

        out.push('\n');
        out.push_str(&render_model_config(&self.model_config.render()?));
        out.push('\n');
        out.push_str(&render_additional(&self.additional));
        out.push('\n');
        out.push_str(&render_error_block(self.error_log.as_deref()));
        Ok(out)
    }

    pub fn render_json(&self) -> Result<String, ReportError> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}

pub fn render_environment(info: &EnvironmentInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", HEADER_ENVIRONMENT);
    for (key, value) in info.entries() {
        let _ = writeln!(out, "* **{}**: {}", key, value);
    }
    out
}

fn render_model_config(config: &str) -> String {
    format!("{}\n{}\n{}\n{}\n", HEADER_MODEL_CONFIG, FENCE_JSON, config, FENCE)
}

fn render_additional(additional: &AdditionalInfo) -> String {
    let image_size = additional
        .image_size
        .map_or_else(|| NOT_PROVIDED.to_string(), |size| size.to_string());
    let visible = additional.cuda_visible_devices.as_deref().unwrap_or(NOT_SET);

    let mut out = String::new();
    let _ = writeln!(out, "{}", HEADER_ADDITIONAL);
    let _ = writeln!(out, "* **{}**: {}", KEY_IMAGE_SIZE, image_size);
    let _ = writeln!(out, "* **{}**: {}", CUDA_VISIBLE_DEVICES, visible);
    out
}

fn render_error_block(error_log: Option<&str>) -> String {
    let mut out = format!("{}\n{}\n", HEADER_ERROR_MESSAGE, FENCE);
    if let Some(log) = error_log.map(str::trim_end).filter(|l| !l.is_empty()) {
        out.push_str(log);
        out.push('\n');
    }
    out.push_str(FENCE);
    out.push('\n');
    out
}
