//! log-insight - 命令行入口
//!
//! 负责：
//! - 解析命令行参数并加载分层配置
//! - 初始化日志系统
//! - 注入 API 密钥，构建摘要后端
//! - 写出报告和图表数据

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use log_insight::application::{has_supported_extension, Analyzer};
use log_insight::error::AppError;
use log_insight::models::{AppConfig, AppConfigLoader, Severity};
use log_insight::monitoring::init_tracing;
use log_insight::services::{download_file_name, render, GeminiBackend, ReportFormat};
use log_insight::utils::ApiKey;
use tracing::{debug, info, warn};

/// 报告输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatChoice {
    Markdown,
    Html,
    Both,
}

impl FormatChoice {
    fn formats(self) -> Vec<ReportFormat> {
        match self {
            FormatChoice::Markdown => vec![ReportFormat::Markdown],
            FormatChoice::Html => vec![ReportFormat::Html],
            FormatChoice::Both => vec![ReportFormat::Markdown, ReportFormat::Html],
        }
    }
}

/// Summarize a log file with a hosted language model and export reports.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log file to analyze (.log or .txt)
    #[arg(required_unless_present = "print_config")]
    file: Option<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, env = "LOG_INSIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Report format to write
    #[arg(short, long, value_enum, default_value_t = FormatChoice::Markdown)]
    format: FormatChoice,

    /// Directory for report files
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Also write the timeline chart data as JSON to this path
    #[arg(long)]
    chart_json: Option<PathBuf>,

    /// Override extractor.max_notable_lines
    #[arg(long)]
    max_lines: Option<usize>,

    /// Override extractor.notable_threshold (CRITICAL, ERROR, WARN, INFO, DEBUG, UNKNOWN)
    #[arg(long)]
    threshold: Option<Severity>,

    /// Override summarizer.models (comma separated, highest priority first)
    #[arg(long, value_delimiter = ',')]
    models: Vec<String>,

    /// Append models listed by the backend after the configured ones
    #[arg(long)]
    discover_models: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    /// 命令行参数最后覆盖配置
    fn apply_overrides(&self, mut config: AppConfig) -> log_insight::Result<AppConfig> {
        if let Some(max_lines) = self.max_lines {
            config.extractor.max_notable_lines = max_lines;
        }
        if let Some(threshold) = self.threshold {
            config.extractor.notable_threshold = threshold;
        }
        if !self.models.is_empty() {
            config.summarizer.models = self.models.clone();
        }
        if self.discover_models {
            config.summarizer.discover_models = true;
        }
        config.validated()
    }
}

/// 先加载 .env 再解析参数，clap 的 `env` 回退才能读到 .env 中的值
fn parse_cli_with_dotenv<I, T>(dotenv: Option<&Path>, args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let _ = match dotenv {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    Cli::parse_from(args)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<()> {
    // `LOG_INSIGHT_CONFIG` 和 GOOGLE_API_KEY 都可能来自 .env
    let cli = parse_cli_with_dotenv(None, std::env::args_os());

    let loader = AppConfigLoader::load(cli.config.clone())?;
    let config_source = loader.source().map(Path::to_path_buf);
    let config = cli.apply_overrides(loader.into_config())?;

    if cli.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    // 加载配置时日志系统尚未初始化，这里补记配置来源
    let _guard = init_tracing(&config.logging)?;
    info!("log-insight v{}", env!("CARGO_PKG_VERSION"));
    debug!(
        source = ?config_source,
        models = ?config.summarizer.models,
        discover_models = config.summarizer.discover_models,
        max_notable_lines = config.extractor.max_notable_lines,
        "Effective configuration"
    );

    let Some(path) = cli.file.as_deref() else {
        return Err(AppError::validation_error("No log file given").into());
    };
    let source_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if !has_supported_extension(&source_name) {
        warn!(file = %source_name, "File does not have a .log or .txt extension, analyzing anyway");
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        AppError::io_error(
            format!("Failed to read log file: {}", e),
            Some(path.to_path_buf()),
        )
    })?;

    let api_key = ApiKey::from_env(&config.summarizer.api_key_env);
    let backend = GeminiBackend::new(&config.summarizer, api_key).map_err(AppError::from)?;
    let analyzer = Analyzer::new(&config, backend)?;

    let report = analyzer.analyze(&bytes, &source_name).await;

    println!("{}", report.summary.text());

    tokio::fs::create_dir_all(&cli.out_dir).await.map_err(|e| {
        AppError::io_error(
            format!("Failed to create output directory: {}", e),
            Some(cli.out_dir.clone()),
        )
    })?;

    for format in cli.format.formats() {
        let target = cli.out_dir.join(download_file_name(&source_name, format));
        write_artifact(&target, render(&report, format)).await?;
        info!(path = %target.display(), %format, "Report written");
    }

    if let Some(chart_path) = cli.chart_json.as_deref() {
        let json = serde_json::to_string_pretty(&report.chart).map_err(AppError::from)?;
        write_artifact(chart_path, json).await?;
        info!(path = %chart_path.display(), points = report.chart.len(), "Chart data written");
    }

    if report.summary.is_failure() {
        warn!(
            analysis_id = %report.analysis_id,
            attempts = report.summary.attempt_count(),
            "Summary unavailable; reports contain the failure diagnostic"
        );
    }

    Ok(())
}

async fn write_artifact(path: &Path, contents: String) -> log_insight::Result<()> {
    tokio::fs::write(path, contents).await.map_err(|e| {
        AppError::io_error(
            format!("Failed to write {}: {}", path.display(), e),
            Some(path.to_path_buf()),
        )
    })
}
