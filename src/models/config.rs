//! 配置相关数据结构
//!
//! 使用行业标准的 `config` crate 实现多层配置：
//! - 默认值 → 配置文件（TOML/JSON）→ 环境变量
//! - 环境变量前缀：`LOG_INSIGHT_`，层级分隔符 `__`
//!   （例如 `LOG_INSIGHT_SUMMARIZER__MODELS=gemini-pro,gemini-1.0-pro`）
//!
//! API 密钥不属于配置内容，这里只记录从哪个环境变量读取。

use config::{Config, Environment, File};
use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::{Validate, ValidationError};

use super::log_event::Severity;
use crate::error::{AppError, EyreResult, Result};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "LOG_INSIGHT";

/// 应用配置根结构
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate(nested)]
    pub extractor: ExtractorConfig,

    #[validate(nested)]
    pub severity: SeverityConfig,

    #[validate(nested)]
    pub summarizer: SummarizerConfig,

    #[validate(nested)]
    pub logging: LoggingConfig,
}

/// 行提取配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ExtractorConfig {
    /// 发送给摘要后端的最大行数（取文件中最前面的 N 行）
    #[validate(range(min = 1, max = 10000))]
    pub max_notable_lines: usize,

    /// 纳入摘要的最低级别
    pub notable_threshold: Severity,
}

/// 一条级别规则：命中任一关键词即归为该级别
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityRule {
    pub severity: Severity,
    pub keywords: Vec<String>,
}

impl SeverityRule {
    pub fn new(severity: Severity, keywords: &[&str]) -> Self {
        Self {
            severity,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// 级别关键词表，顺序即优先级（靠前者胜出）
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SeverityConfig {
    #[validate(custom(function = "validate_severity_rules"))]
    pub rules: Vec<SeverityRule>,
}

/// 摘要后端配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SummarizerConfig {
    /// 模型标识，按优先级排列
    #[validate(custom(function = "validate_models"))]
    pub models: Vec<String>,

    #[validate(length(min = 1, max = 500))]
    pub endpoint: String,

    /// 单次调用超时
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_seconds: u64,

    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,

    /// 读取 API 密钥的环境变量名
    #[validate(length(min = 1, max = 100))]
    pub api_key_env: String,

    /// 向后端查询可用模型，追加在 `models` 之后作为最后的回退
    pub discover_models: bool,
}

/// 日志输出配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter 指令，`RUST_LOG` 优先
    #[validate(length(min = 1, max = 200))]
    pub level: String,

    /// 以 JSON 格式输出
    pub json: bool,

    /// 额外写入的日志文件
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_notable_lines: 200,
            notable_threshold: Severity::Warn,
        }
    }
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                SeverityRule::new(Severity::Critical, &["CRITICAL", "FATAL"]),
                SeverityRule::new(Severity::Error, &["ERROR"]),
                SeverityRule::new(Severity::Warn, &["WARNING", "WARN"]),
                SeverityRule::new(Severity::Info, &["INFO"]),
                SeverityRule::new(Severity::Debug, &["DEBUG"]),
            ],
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            models: vec![
                "gemini-1.5-flash-latest".to_string(),
                "gemini-1.0-pro".to_string(),
                "gemini-pro".to_string(),
            ],
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            request_timeout_seconds: 30,
            temperature: 0.2,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            discover_models: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl SummarizerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[allow(clippy::ptr_arg)]
fn validate_models(models: &Vec<String>) -> std::result::Result<(), ValidationError> {
    if models.is_empty() {
        return Err(ValidationError::new("models_empty")
            .with_message("at least one model identifier is required".into()));
    }
    if models.iter().any(|m| m.trim().is_empty()) {
        return Err(ValidationError::new("model_blank")
            .with_message("model identifiers must not be blank".into()));
    }
    Ok(())
}

#[allow(clippy::ptr_arg)]
fn validate_severity_rules(rules: &Vec<SeverityRule>) -> std::result::Result<(), ValidationError> {
    if rules.is_empty() {
        return Err(ValidationError::new("rules_empty")
            .with_message("severity table must contain at least one rule".into()));
    }

    let mut seen = HashSet::new();
    for rule in rules {
        if rule.severity == Severity::Unknown {
            return Err(ValidationError::new("rule_unknown")
                .with_message("UNKNOWN is the fallback level and cannot have keywords".into()));
        }
        if !seen.insert(rule.severity) {
            return Err(ValidationError::new("rule_duplicate")
                .with_message(format!("severity {} is listed more than once", rule.severity).into()));
        }
        if rule.keywords.is_empty() || rule.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ValidationError::new("rule_keywords")
                .with_message(format!("severity {} needs non-blank keywords", rule.severity).into()));
        }
    }
    Ok(())
}

impl AppConfig {
    /// 序列化为 TOML（用于 `--print-config`）
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AppError::config_error(format!("Failed to serialize config to TOML: {}", e)))
    }

    /// 校验整个配置树
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }
}

/// 分层配置加载器
pub struct AppConfigLoader {
    config: AppConfig,
    source: Option<PathBuf>,
}

impl AppConfigLoader {
    /// 从默认值、可选配置文件和进程环境变量加载配置
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// 同 [`load`](Self::load)，但可以用给定的键值表代替进程环境变量
    pub fn load_with_env(
        path: Option<PathBuf>,
        env_overrides: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let config = Self::build(path.as_deref(), env_overrides)
            .map_err(AppError::from)?
            .validated()
            .map_err(|e| match &path {
                Some(p) => e.with_context(format!("Invalid configuration in {}", p.display())),
                None => e,
            })?;

        tracing::debug!(
            source = ?path,
            models = ?config.summarizer.models,
            max_notable_lines = config.extractor.max_notable_lines,
            "Configuration loaded"
        );

        Ok(Self {
            config,
            source: path,
        })
    }

    fn build(
        path: Option<&Path>,
        env_overrides: Option<HashMap<String, String>>,
    ) -> EyreResult<AppConfig> {
        let defaults = Config::try_from(&AppConfig::default())
            .wrap_err("Failed to serialize default configuration")?;

        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            if !path.exists() {
                eyre::bail!("Config file not found: {}", path.display());
            }
            builder = builder.add_source(File::from(path));
        }

        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("summarizer.models")
            .source(env_overrides);

        builder
            .add_source(environment)
            .build()
            .wrap_err("Failed to build layered configuration")?
            .try_deserialize()
            .wrap_err("Failed to deserialize configuration")
    }

    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// 配置文件路径（若有）
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
