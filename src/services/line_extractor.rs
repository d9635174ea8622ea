//! 关键行提取
//!
//! 逐行分类，挑出达到阈值的行交给摘要后端。只保留文件中最前面的 `max_lines` 行，
//! 保证发送的数据量有上限。

use std::sync::Arc;

use crate::models::config::ExtractorConfig;
use crate::models::{NotableLine, NotableLineSet, Severity};

use super::severity_classifier::SeverityClassifier;

/// 一个非空行（去除首尾空白）及其行号（从 1 开始）
pub(crate) fn non_blank_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

/// 已分类的行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine<'a> {
    pub line_number: usize,
    pub text: &'a str,
    pub severity: Severity,
}

/// 提取选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub max_lines: usize,
    pub threshold: Severity,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::from(&ExtractorConfig::default())
    }
}

impl From<&ExtractorConfig> for ExtractOptions {
    fn from(config: &ExtractorConfig) -> Self {
        Self {
            max_lines: config.max_notable_lines,
            threshold: config.notable_threshold,
        }
    }
}

/// 对每个非空行分类
pub fn classify_lines<'a>(
    content: &'a str,
    classifier: &SeverityClassifier,
) -> Vec<ClassifiedLine<'a>> {
    non_blank_lines(content)
        .map(|(line_number, text)| ClassifiedLine {
            line_number,
            text,
            severity: classifier.classify(text),
        })
        .collect()
}

/// 提取达到阈值的行
///
/// 结果保持文件顺序，最多 `options.max_lines` 行；`total_notable` 记录截断前的总数。
pub fn extract_notable(
    content: &str,
    classifier: &SeverityClassifier,
    options: ExtractOptions,
) -> NotableLineSet {
    let mut lines = Vec::new();
    let mut total_notable = 0usize;

    for (line_number, text) in non_blank_lines(content) {
        let severity = classifier.classify(text);
        if !severity.is_notable(options.threshold) {
            continue;
        }

        total_notable += 1;
        if lines.len() < options.max_lines {
            lines.push(NotableLine {
                line_number,
                raw_text: Arc::from(text),
                severity,
            });
        }
    }

    if total_notable > lines.len() {
        tracing::debug!(
            total_notable,
            kept = lines.len(),
            cap = options.max_lines,
            "Notable lines truncated to cap"
        );
    }

    NotableLineSet {
        lines,
        total_notable,
        cap: options.max_lines,
        threshold: options.threshold,
    }
}
