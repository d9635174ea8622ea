//! log-insight
//!
//! 读取单个文本日志，提取结构化事件和时间线图表数据，
//! 把达到阈值的关键行交给托管语言模型生成摘要（按模型优先级回退），
//! 并导出 Markdown / HTML 报告。

pub mod application;
pub mod error;
pub mod models;
pub mod monitoring;
pub mod services;
pub mod utils;

pub use application::Analyzer;
pub use error::{AppError, Result};
pub use models::{AnalysisReport, AppConfig, Severity, SummaryResult};
