pub mod chart_builder;
pub mod event_builder;
pub mod gemini_backend;
pub mod line_extractor;
pub mod prompts;
pub mod report;
pub mod severity_classifier;
pub mod summarizer;
pub mod timestamp_parser;

pub use chart_builder::build_chart_data;
pub use event_builder::build_events;
pub use gemini_backend::GeminiBackend;
pub use line_extractor::{classify_lines, extract_notable, ClassifiedLine, ExtractOptions};
pub use report::{data_url, download_file_name, render, ReportFormat};
pub use severity_classifier::{SeverityClassifier, SeverityTable};
pub use summarizer::{BackendError, SummarizationClient, SummaryBackend};
pub use timestamp_parser::{TimestampMatch, TimestampParser};
