//! 时间戳解析
//!
//! 按固定顺序尝试一组时间戳模板，第一个能解析为合法日期时间的匹配胜出。
//! 只解析字面文本，不做时区推断；没有年份的 syslog 时间戳不识别。

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// 时间戳模板
struct TimestampTemplate {
    name: &'static str,
    pattern: Regex,
    /// 依次尝试的 chrono 格式，输入为 `"{date} {time}[.{frac}]"`
    formats: &'static [&'static str],
}

impl TimestampTemplate {
    fn new(name: &'static str, pattern: &str, formats: &'static [&'static str]) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("timestamp template must be a valid regex"),
            formats,
        }
    }

    fn parse_captures(&self, caps: &Captures<'_>) -> Option<NaiveDateTime> {
        let date = caps.name("date")?.as_str();
        let time = caps.name("time")?.as_str();
        let candidate = match caps.name("frac") {
            Some(frac) => format!("{} {}.{}", date, time, frac.as_str()),
            None => format!("{} {}", date, time),
        };

        self.formats
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(&candidate, format).ok())
    }
}

// 使用 Lazy 静态初始化正则表达式，避免重复编译
static TEMPLATES: Lazy<Vec<TimestampTemplate>> = Lazy::new(|| {
    vec![
        // 2024-06-25 10:00:22 / 2024-06-25T10:00:22.123 / 2024-06-25 10:00:22,123
        TimestampTemplate::new(
            "iso",
            r"(?P<date>\d{4}-\d{2}-\d{2})[T ](?P<time>\d{2}:\d{2}:\d{2})(?:[.,](?P<frac>\d{1,9}))?",
            &["%Y-%m-%d %H:%M:%S%.f"],
        ),
        // 2024/06/25 10:00:22
        TimestampTemplate::new(
            "ymd-slash",
            r"(?P<date>\d{4}/\d{2}/\d{2})[T ](?P<time>\d{2}:\d{2}:\d{2})(?:[.,](?P<frac>\d{1,9}))?",
            &["%Y/%m/%d %H:%M:%S%.f"],
        ),
        // 25/06/2024 10:00:22，日在前优先，其次按美式月在前
        TimestampTemplate::new(
            "dmy-slash",
            r"(?P<date>\d{2}/\d{2}/\d{4}) (?P<time>\d{2}:\d{2}:\d{2})(?:[.,](?P<frac>\d{1,9}))?",
            &["%d/%m/%Y %H:%M:%S%.f", "%m/%d/%Y %H:%M:%S%.f"],
        ),
        // Apache 访问日志：25/Jun/2024:10:00:22 +0000，时区偏移只计入匹配范围
        TimestampTemplate::new(
            "apache",
            r"(?P<date>\d{2}/[A-Za-z]{3}/\d{4}):(?P<time>\d{2}:\d{2}:\d{2})(?: [+-]\d{4})?",
            &["%d/%b/%Y %H:%M:%S"],
        ),
        // 20240625 10:00:22
        TimestampTemplate::new(
            "compact",
            r"(?P<date>\d{8})[T ](?P<time>\d{2}:\d{2}:\d{2})(?:[.,](?P<frac>\d{1,9}))?",
            &["%Y%m%d %H:%M:%S%.f"],
        ),
    ]
});

/// 时间戳匹配结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampMatch {
    pub timestamp: NaiveDateTime,
    /// 匹配在行内的字节范围
    pub start: usize,
    pub end: usize,
    /// 命中的模板名称
    pub template: &'static str,
}

/// 时间戳解析器
pub struct TimestampParser;

impl TimestampParser {
    /// 解析行内第一个可识别的时间戳
    ///
    /// 正则命中但不是合法日期（例如 13 月）时继续尝试后续匹配和模板。
    pub fn parse(line: &str) -> Option<TimestampMatch> {
        for template in TEMPLATES.iter() {
            for caps in template.pattern.captures_iter(line) {
                let Some(timestamp) = template.parse_captures(&caps) else {
                    continue;
                };
                let whole = caps.get(0)?;
                return Some(TimestampMatch {
                    timestamp,
                    start: whole.start(),
                    end: whole.end(),
                    template: template.name,
                });
            }
        }
        None
    }

    /// 只返回时间戳本身
    pub fn parse_timestamp(line: &str) -> Option<NaiveDateTime> {
        Self::parse(line).map(|m| m.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_common_format() {
        let ts = TimestampParser::parse_timestamp("2024-06-25 10:00:22 ERROR Database connection failed");
        assert_eq!(ts, Some(at(2024, 6, 25, 10, 0, 22)));
        assert_eq!(ts.unwrap().to_string(), "2024-06-25 10:00:22");
    }

    #[test]
    fn test_comma_milliseconds() {
        let ts = TimestampParser::parse_timestamp("2024-06-25 10:00:01,123 INFO Application started")
            .expect("should parse");
        assert_eq!(ts.nanosecond(), 123_000_000);
        assert_eq!(ts.second(), 1);
    }

    #[test]
    fn test_iso_t_separator_with_fraction() {
        let ts = TimestampParser::parse_timestamp("[2024-06-25T10:00:22.5] WARN slow")
            .expect("should parse");
        assert_eq!(ts.nanosecond(), 500_000_000);
    }

    #[test]
    fn test_slash_formats() {
        assert_eq!(
            TimestampParser::parse_timestamp("2024/06/25 10:00:22 INFO x"),
            Some(at(2024, 6, 25, 10, 0, 22))
        );
        // 日在前
        assert_eq!(
            TimestampParser::parse_timestamp("25/06/2024 10:00:22 INFO x"),
            Some(at(2024, 6, 25, 10, 0, 22))
        );
        // 日在前不合法时按美式解析
        assert_eq!(
            TimestampParser::parse_timestamp("06/25/2024 10:00:22 INFO x"),
            Some(at(2024, 6, 25, 10, 0, 22))
        );
    }

    #[test]
    fn test_apache_format() {
        let line = r#"127.0.0.1 - - [25/Jun/2024:10:00:22 +0000] "GET / HTTP/1.1" 500"#;
        let m = TimestampParser::parse(line).expect("should parse");
        assert_eq!(m.timestamp, at(2024, 6, 25, 10, 0, 22));
        assert_eq!(m.template, "apache");
        assert_eq!(&line[m.start..m.end], "25/Jun/2024:10:00:22 +0000");
    }

    #[test]
    fn test_compact_format() {
        assert_eq!(
            TimestampParser::parse_timestamp("20240625 10:00:22 job done"),
            Some(at(2024, 6, 25, 10, 0, 22))
        );
    }

    #[test]
    fn test_invalid_calendar_date_falls_through() {
        assert_eq!(TimestampParser::parse_timestamp("2024-13-45 10:00:22 bogus"), None);
        // 第一个候选非法，第二个合法
        assert_eq!(
            TimestampParser::parse_timestamp("2024-13-45 10:00:22 then 2024-06-25 10:00:23"),
            Some(at(2024, 6, 25, 10, 0, 23))
        );
    }

    #[test]
    fn test_no_timestamp() {
        assert_eq!(TimestampParser::parse("something happened"), None);
        // syslog 风格没有年份，不识别
        assert_eq!(TimestampParser::parse("Jun 25 10:00:22 host sshd: ok"), None);
    }

    #[test]
    fn test_match_span() {
        let line = "2024-06-25 10:00:22,333 ERROR x";
        let m = TimestampParser::parse(line).unwrap();
        assert_eq!(m.start, 0);
        assert_eq!(&line[m.start..m.end], "2024-06-25 10:00:22,333");
        assert_eq!(m.template, "iso");
    }
}
