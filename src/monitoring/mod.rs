/*!
 * 日志初始化
 *
 * 所有输出写入 stderr，stdout 只留给摘要正文。
 * `RUST_LOG` 优先于配置中的 `logging.level`。
 */
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::error::{AppError, Result};
use crate::models::config::LoggingConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 构建过滤器：`RUST_LOG` 存在时使用它，否则使用配置的级别
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            AppError::config_error(format!("Invalid logging.level '{}': {}", config.level, e))
        }),
    }
}

/**
 * 初始化全局 tracing 订阅者
 *
 * # 返回
 * 配置了日志文件时返回后台写线程的守卫，调用方需持有到进程结束
 */
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = build_env_filter(config)?;
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let stderr_layer = if config.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };
    layers.push(stderr_layer);

    let mut guard = None;
    if let Some(file) = config.file.as_deref() {
        let path = Path::new(file);
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = path.file_name().ok_or_else(|| {
            AppError::config_error(format!("logging.file '{}' has no file name", file))
        })?;

        std::fs::create_dir_all(directory).map_err(|e| {
            AppError::io_error(
                format!("Failed to create log directory: {}", e),
                Some(directory.to_path_buf()),
            )
        })?;

        let appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        layers.push(
            fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
        guard = Some(worker_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| AppError::config_error(format!("Failed to initialize tracing: {}", e)))?;

    Ok(guard)
}
