//! 结构化事件构建
//!
//! 每个非空行生成一个 [`LogEvent`]。级别来自与行提取器相同的分类器实例，
//! 时间戳来自 [`TimestampParser`]；没有时间戳的行仍然保留，并记录一条解析告警。

use std::sync::Arc;

use crate::models::{LogEvent, ParseWarning, ParsedLog};

use super::line_extractor::non_blank_lines;
use super::severity_classifier::SeverityClassifier;
use super::timestamp_parser::{TimestampMatch, TimestampParser};

/// 解析整个输入
///
/// 不会失败：无法识别时间戳只产生 [`ParseWarning`]。
pub fn build_events(content: &str, classifier: &SeverityClassifier) -> ParsedLog {
    let mut parsed = ParsedLog::default();

    for (line_number, text) in non_blank_lines(content) {
        let timestamp_match = TimestampParser::parse(text);
        if timestamp_match.is_none() {
            parsed.warnings.push(ParseWarning {
                line_number,
                reason: "no recognizable timestamp".to_string(),
            });
        }

        let message = extract_message(text, timestamp_match.as_ref(), classifier);
        let raw_text: Arc<str> = Arc::from(text);
        let message = if message.len() == text.len() {
            Arc::clone(&raw_text)
        } else {
            Arc::from(message)
        };

        parsed.events.push(LogEvent {
            line_number,
            raw_text,
            message,
            timestamp: timestamp_match.map(|m| m.timestamp),
            severity: classifier.classify(text),
        });
    }

    tracing::debug!(
        events = parsed.events.len(),
        timed = parsed.timed_count(),
        warnings = parsed.warnings.len(),
        "Structured events built"
    );

    parsed
}

/// 去掉行首的时间戳和级别标记
///
/// 时间戳只有位于行首（允许前面有 `[`）时才剥离；剥离后为空则返回原行。
fn extract_message<'a>(
    text: &'a str,
    timestamp: Option<&TimestampMatch>,
    classifier: &SeverityClassifier,
) -> &'a str {
    let mut rest = text;

    if let Some(m) = timestamp {
        let prefix = &text[..m.start];
        if prefix.chars().all(|c| c == '[' || c.is_whitespace()) {
            rest = text[m.end..].trim_start();
            if prefix.contains('[') {
                rest = rest.strip_prefix(']').unwrap_or(rest).trim_start();
            }
        }
    }

    let message = classifier.strip_leading_keyword(rest).trim();
    if message.is_empty() {
        text
    } else {
        message
    }
}
