use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::services::summarizer::BackendError;

/**
 * 应用错误类型 - 使用 miette 提供用户友好的错误诊断
 *
 * 只有读取输入、加载配置、写出产物这类失败会以 AppError 形式上抛；
 * 摘要后端失败在回退链内部消化，最终体现为 SummaryResult。
 */
#[derive(Error, Debug, Diagnostic)]
pub enum AppError {
    #[error("IO error: {message}")]
    #[diagnostic(
        code(app::io_error_detailed),
        help("Ensure the path exists and is readable/writable")
    )]
    IoDetailed {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(app::config_error),
        help("Check the config file and LOG_INSIGHT_* environment variables")
    )]
    Config(String),

    #[error("Validation error: {0}")]
    #[diagnostic(
        code(app::validation_error),
        help("Check that your input meets the required format and constraints")
    )]
    Validation(String),

    #[error("Summarization backend error: {0}")]
    #[diagnostic(
        code(app::backend_error),
        help("Check the API key, network connection and configured model identifiers")
    )]
    Backend(#[from] BackendError),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(app::serialization_error))]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /**
     * 为错误添加上下文信息
     */
    pub fn with_context(self, context: impl Into<String>) -> Self {
        let context = context.into();
        match self {
            AppError::Config(message) => AppError::Config(format!("{}: {}", context, message)),
            AppError::Validation(message) => {
                AppError::Validation(format!("{}: {}", context, message))
            }
            AppError::IoDetailed { message, path } => AppError::IoDetailed {
                message: format!("{}: {}", context, message),
                path,
            },
            other => other,
        }
    }

    /**
     * 创建配置错误
     */
    pub fn config_error(message: impl Into<String>) -> Self {
        AppError::Config(message.into())
    }

    /**
     * 创建验证错误
     */
    pub fn validation_error(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /**
     * 创建详细的IO错误
     */
    pub fn io_error(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        AppError::IoDetailed {
            message: message.into(),
            path,
        }
    }
}

/**
 * 统一结果类型
 *
 * 对于内部错误处理（配置加载），使用 eyre::Result
 * 对于用户可见的错误，转换为 AppError
 */
pub type Result<T> = std::result::Result<T, AppError>;

/**
 * 内部结果类型 - 使用 eyre 进行错误传播
 */
pub type EyreResult<T> = eyre::Result<T>;

/**
 * 将 eyre::Report 转换为 AppError（保留完整错误链）
 */
impl From<eyre::Report> for AppError {
    fn from(error: eyre::Report) -> Self {
        AppError::Config(format!("{:#}", error))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}
