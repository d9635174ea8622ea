use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 日志严重级别
///
/// 声明顺序即阈值比较顺序：`Unknown < Debug < Info < Warn < Error < Critical`。
/// 关键词冲突时谁胜出由 [`SeverityTable`](crate::services::SeverityTable) 的顺序决定，
/// 与这里的 `Ord` 无关。
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Unknown,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl Severity {
    /// 所有级别，按从高到低排列（用于报告和统计面板）
    pub const ALL: [Severity; 6] = [
        Severity::Critical,
        Severity::Error,
        Severity::Warn,
        Severity::Info,
        Severity::Debug,
        Severity::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warn => "WARN",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
            Severity::Unknown => "UNKNOWN",
        }
    }

    /// 在给定阈值下是否属于"值得关注"的行
    ///
    /// `Unknown` 只有在阈值本身是 `Unknown` 时才会被纳入。
    pub fn is_notable(&self, threshold: Severity) -> bool {
        if threshold == Severity::Unknown {
            return true;
        }
        *self != Severity::Unknown && *self >= threshold
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(level: &str) -> Result<Self, Self::Err> {
        match level.trim().to_lowercase().as_str() {
            "critical" | "crit" | "fatal" => Ok(Severity::Critical),
            "error" | "err" => Ok(Severity::Error),
            "warn" | "warning" | "wrn" => Ok(Severity::Warn),
            "info" | "inf" => Ok(Severity::Info),
            "debug" | "dbg" => Ok(Severity::Debug),
            "unknown" => Ok(Severity::Unknown),
            other => Err(format!("unknown severity level: {}", other)),
        }
    }
}

/// 单行日志事件
///
/// 每个非空行生成一个，创建后不再修改，只存活于一次分析请求内。
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LogEvent {
    /// 在输入文件中的行号（从 1 开始）
    pub line_number: usize,
    /// 去除首尾空白后的原始行
    pub raw_text: Arc<str>,
    /// 去掉前导时间戳和级别标记后的正文
    pub message: Arc<str>,
    /// 解析出的时间戳，不做任何时区推断
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<NaiveDateTime>,
    pub severity: Severity,
}

/// 非致命解析告警：该行没有可识别的时间戳，事件仍然保留
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ParseWarning {
    pub line_number: usize,
    pub reason: String,
}

/// 结构化事件构建结果
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ParsedLog {
    pub events: Vec<LogEvent>,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedLog {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// 带时间戳的事件数
    pub fn timed_count(&self) -> usize {
        self.events.iter().filter(|e| e.timestamp.is_some()).count()
    }
}

/// 达到阈值的一行
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NotableLine {
    pub line_number: usize,
    pub raw_text: Arc<str>,
    pub severity: Severity,
}

/// 发送给摘要后端的行集合
///
/// 保持文件顺序；超过上限时只保留前 `cap` 行。
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NotableLineSet {
    pub lines: Vec<NotableLine>,
    /// 截断前满足阈值的总行数
    pub total_notable: usize,
    pub cap: usize,
    pub threshold: Severity,
}

impl NotableLineSet {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn truncated(&self) -> bool {
        self.total_notable > self.lines.len()
    }

    /// 拼接为提示词中的日志片段，每行一条
    pub fn as_prompt_block(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.raw_text.as_ref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(line_number: usize, text: &str, severity: Severity) -> NotableLine {
        NotableLine {
            line_number,
            raw_text: text.into(),
            severity,
        }
    }

    #[test]
    fn test_notable_set_prompt_block_and_truncation() {
        let set = NotableLineSet {
            lines: vec![
                line(1, "ERROR disk failed", Severity::Error),
                line(4, "WARN cpu high", Severity::Warn),
            ],
            total_notable: 3,
            cap: 2,
            threshold: Severity::Warn,
        };
        assert_eq!(set.as_prompt_block(), "ERROR disk failed\nWARN cpu high");
        assert!(set.truncated());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Error > Severity::Warn);
        assert!(Severity::Warn > Severity::Info);
        assert!(Severity::Info > Severity::Debug);
        assert!(Severity::Debug > Severity::Unknown);
    }

    #[test]
    fn test_is_notable_default_threshold() {
        assert!(Severity::Critical.is_notable(Severity::Warn));
        assert!(Severity::Error.is_notable(Severity::Warn));
        assert!(Severity::Warn.is_notable(Severity::Warn));
        assert!(!Severity::Info.is_notable(Severity::Warn));
        assert!(!Severity::Debug.is_notable(Severity::Warn));
        assert!(!Severity::Unknown.is_notable(Severity::Warn));
    }

    #[test]
    fn test_is_notable_reconfigured_threshold() {
        // 阈值为 Unknown 时所有行都进入摘要
        assert!(Severity::Unknown.is_notable(Severity::Unknown));
        assert!(Severity::Debug.is_notable(Severity::Unknown));
        // 阈值为 Debug 时 Unknown 仍被排除
        assert!(!Severity::Unknown.is_notable(Severity::Debug));
        assert!(Severity::Debug.is_notable(Severity::Debug));
    }

    #[test]
    fn test_severity_from_str_aliases() {
        assert_eq!("FATAL".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("warning".parse::<Severity>().unwrap(), Severity::Warn);
        assert_eq!(" Err ".parse::<Severity>().unwrap(), Severity::Error);
        assert!("verbose".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_serde_uppercase() {
        let json = serde_json::to_string(&Severity::Warn).unwrap();
        assert_eq!(json, "\"WARN\"");
        let parsed: Severity = serde_json::from_str("\"CRITICAL\"").unwrap();
        assert_eq!(parsed, Severity::Critical);
    }
}
