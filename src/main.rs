mod config;
mod consts;
mod device;
mod model;
mod report;
mod runtime;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{ConfigManager, OutputFormat};
use consts::*;
use device::EnvironmentCollector;
use model::{ImageSize, ModelConfig};
use report::{AdditionalInfo, IssueReport, ReportError};
use runtime::ProcessRunner;
use std::ffi::OsString;
use std::path::PathBuf;

/// Collects environment details for a bug report.
#[derive(Debug, Parser)]
#[command(name = "envreport", version, about)]
struct Cli {
    /// Model config.json, or a model directory containing one
    #[arg(short, long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Input image size, e.g. 640x480
    #[arg(long, value_name = "WxH")]
    image_size: Option<String>,

    /// File holding the error message and stack trace
    #[arg(long, value_name = "PATH")]
    error_log: Option<PathBuf>,

    /// Output format (overrides the config file)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志，输出到 stderr，不影响报告内容
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::from_path(path.clone())?,
        None => ConfigManager::new()?,
    };

    match cli.command {
        Some(Commands::Config { init }) => show_config(&config_manager, init),
        None => run_report(&cli, &config_manager).await,
    }
}

fn show_config(config_manager: &ConfigManager, init: bool) -> Result<()> {
    if init {
        config_manager.save()?;
        log::info!("Wrote {}", config_manager.config_path().display());
    }
    println!("# {}", config_manager.config_path().display());
    println!(
        "{}",
        serde_json::to_string_pretty(config_manager.get_config())?
    );
    Ok(())
}

async fn run_report(cli: &Cli, config_manager: &ConfigManager) -> Result<()> {
    let config = config_manager.get_config();

    // 先校验输入，避免输出半份报告
    let model_path = cli.model.as_deref().ok_or(ReportError::MissingModel)?;
    let model_config = ModelConfig::load(model_path)?;
    let image_size = cli
        .image_size
        .as_deref()
        .map(str::parse::<ImageSize>)
        .transpose()?;
    let error_log = match &cli.error_log {
        Some(path) => Some(std::fs::read_to_string(path).map_err(|e| {
            ReportError::ErrorLogRead {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?),
        None => None,
    };
    let cuda_visible_devices = visible_devices(std::env::var_os(CUDA_VISIBLE_DEVICES));

    log::info!("Collecting environment information");
    let runner = ProcessRunner::new(config.probe_timeout_secs);
    let collected = EnvironmentCollector::new(&runner, config, cuda_visible_devices.as_deref())
        .collect()
        .await;

    let report = IssueReport::new(
        collected.info,
        collected.probes,
        model_config,
        AdditionalInfo {
            image_size,
            cuda_visible_devices,
        },
        error_log,
    );

    let rendered = match cli.format.unwrap_or(config.format) {
        OutputFormat::Markdown => report.render_markdown()?,
        OutputFormat::Json => report.render_json()?,
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("无法写入报告 {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

/// A set but non-UTF-8 value is still reported, lossily.
fn visible_devices(value: Option<OsString>) -> Option<String> {
    value.map(|v| v.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_report_arguments() {
        let cli = Cli::try_parse_from([
            "envreport",
            "--model",
            "models/llama",
            "--image-size",
            "640x480",
            "--format",
            "json",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.model, Some(PathBuf::from("models/llama")));
        assert_eq!(cli.image_size.as_deref(), Some("640x480"));
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.verbose, 2);
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_config_subcommand() {
        let cli = Cli::try_parse_from(["envreport", "config", "--init"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Config { init: true })));
    }

    #[test]
    fn visible_devices_keeps_set_values() {
        assert_eq!(visible_devices(None), None);
        assert_eq!(
            visible_devices(Some(OsString::from("0,1"))),
            Some("0,1".to_string())
        );
    }

    #[cfg(unix)]
    #[test]
    fn visible_devices_survives_non_utf8() {
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(vec![b'0', b',', 0xff]);
        assert_eq!(visible_devices(Some(raw)), Some("0,\u{fffd}".to_string()));
    }

    #[tokio::test]
    async fn report_without_model_fails_before_probing() {
        let dir = tempfile::TempDir::new().unwrap();
        let manager = ConfigManager::with_vars(dir.path().join("config.json"), &[]).unwrap();
        let cli = Cli::try_parse_from(["envreport"]).unwrap();

        let err = run_report(&cli, &manager).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::MissingModel)
        ));
    }

    #[tokio::test]
    async fn writes_markdown_report_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let model_dir = dir.path().join("model");
        std::fs::create_dir(&model_dir).unwrap();
        std::fs::write(model_dir.join("config.json"), r#"{"model_type": "vit"}"#).unwrap();
        let log_path = dir.path().join("error.txt");
        std::fs::write(&log_path, "ValueError: bad shape\n").unwrap();
        let out_path = dir.path().join("report.md");

        // 指向不存在的程序，避免依赖宿主环境
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"python": "envreport-missing-python", "nvcc": "envreport-missing-nvcc", "nvidia_smi": "envreport-missing-smi"}"#,
        )
        .unwrap();
        let manager = ConfigManager::with_vars(dir.path().join("config.json"), &[]).unwrap();

        let cli = Cli::try_parse_from([
            "envreport".to_string(),
            "--model".to_string(),
            model_dir.display().to_string(),
            "--image-size".to_string(),
            "32x32".to_string(),
            "--error-log".to_string(),
            log_path.display().to_string(),
            "--output".to_string(),
            out_path.display().to_string(),
        ])
        .unwrap();
        run_report(&cli, &manager).await.unwrap();

        let text = std::fs::read_to_string(&out_path).unwrap();
        assert!(text.contains("* **Python**: Not found\n"));
        assert!(text.contains("* **CUDA**: Not found\n"));
        assert!(text.contains("* **GPU**: Not available\n"));
        assert!(text.contains("```json\n{\n  \"model_type\": \"vit\"\n}\n```"));
        assert!(text.contains("* **Image Size**: (32, 32)\n"));
        assert!(text.contains("```\nValueError: bad shape\n```\n"));
    }
}
