//! 应用层 - 组织各个服务完成一次分析

pub mod analyzer;

pub use analyzer::{has_supported_extension, Analyzer, SUPPORTED_EXTENSIONS};
