pub mod analysis;
pub mod chart;
pub mod config;
pub mod log_event;
pub mod summary;

// 重新导出核心类型
pub use analysis::AnalysisReport;
pub use chart::{ChartData, ChartPoint, SeverityCounts};
pub use config::{
    AppConfig, AppConfigLoader, ExtractorConfig, LoggingConfig, SeverityConfig, SeverityRule,
    SummarizerConfig,
};
pub use log_event::{LogEvent, NotableLine, NotableLineSet, ParseWarning, ParsedLog, Severity};
pub use summary::{AttemptRecord, SummaryOutcome, SummaryResult, NO_ISSUES_MESSAGE};
