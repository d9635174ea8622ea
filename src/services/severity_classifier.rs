use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use crate::error::{AppError, Result};
use crate::models::config::{SeverityConfig, SeverityRule};
use crate::models::Severity;

/**
 * 级别关键词表
 *
 * 规则的先后顺序就是优先级：一行同时命中多个级别的关键词时，表中靠前的规则胜出。
 * 行提取器和结构化事件构建器共用同一张表，保证同一行在两处得到相同的级别。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityTable {
    rules: Vec<SeverityRule>,
}

impl SeverityTable {
    pub fn new(rules: Vec<SeverityRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &SeverityConfig) -> Self {
        Self::new(config.rules.clone())
    }

    pub fn rules(&self) -> &[SeverityRule] {
        &self.rules
    }
}

impl Default for SeverityTable {
    fn default() -> Self {
        Self::from_config(&SeverityConfig::default())
    }
}

/**
 * 级别分类器 - 使用Aho-Corasick算法一次扫描匹配全部关键词
 *
 * 执行大小写不敏感的子串匹配，不是单词边界匹配。
 * 例如：关键词"error"会匹配"ERROR occurred"，也会匹配"errors"。
 */
pub struct SeverityClassifier {
    ac: Option<AhoCorasick>,
    /// 模式 ID → (规则位置, 级别)
    pattern_ranks: Vec<(usize, Severity)>,
    /// 按长度降序排列的关键词，用于剥离行首的级别标记
    keywords_longest_first: Vec<String>,
}

impl SeverityClassifier {
    /**
     * 根据关键词表构建分类器
     *
     * # 参数
     * * `table` - 有序的级别规则表
     *
     * # 错误
     * 关键词无法编译为自动机时返回配置错误
     */
    pub fn new(table: &SeverityTable) -> Result<Self> {
        let mut patterns = Vec::new();
        let mut pattern_ranks = Vec::new();

        for (rank, rule) in table.rules().iter().enumerate() {
            for keyword in &rule.keywords {
                let keyword = keyword.trim();
                if keyword.is_empty() {
                    continue;
                }
                patterns.push(keyword.to_string());
                pattern_ranks.push((rank, rule.severity));
            }
        }

        let ac = if patterns.is_empty() {
            tracing::warn!("Severity table has no keywords, every line will be UNKNOWN");
            None
        } else {
            // Standard 语义才支持重叠匹配，需要看到所有命中的关键词
            let ac = AhoCorasickBuilder::new()
                .match_kind(MatchKind::Standard)
                .ascii_case_insensitive(true)
                .build(&patterns)
                .map_err(|e| {
                    AppError::config_error(format!("Failed to build severity matcher: {}", e))
                })?;
            Some(ac)
        };

        let mut keywords_longest_first = patterns;
        keywords_longest_first.sort_by_key(|k| std::cmp::Reverse(k.len()));

        Ok(Self {
            ac,
            pattern_ranks,
            keywords_longest_first,
        })
    }

    /**
     * 对一行文本分类
     *
     * # 返回
     * 命中关键词中优先级最高的级别；没有命中时返回 `Severity::Unknown`
     */
    pub fn classify(&self, text: &str) -> Severity {
        let Some(ref ac) = self.ac else {
            return Severity::Unknown;
        };

        let mut best: Option<(usize, Severity)> = None;
        for mat in ac.find_overlapping_iter(text) {
            let candidate = self.pattern_ranks[mat.pattern().as_usize()];
            if best.map_or(true, |(rank, _)| candidate.0 < rank) {
                best = Some(candidate);
                if candidate.0 == 0 {
                    break;
                }
            }
        }

        best.map(|(_, severity)| severity)
            .unwrap_or(Severity::Unknown)
    }

    /**
     * 剥离行首的级别标记
     *
     * 支持 `ERROR msg`、`[ERROR] msg`、`ERROR: msg` 三种写法；
     * 关键词后紧跟字母数字时（如 `ERRORS`）不视为标记。
     * 没有可剥离的标记时原样返回。
     */
    pub fn strip_leading_keyword<'a>(&self, text: &'a str) -> &'a str {
        let trimmed = text.trim_start();
        let (bracketed, body) = match trimmed.strip_prefix('[') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        for keyword in &self.keywords_longest_first {
            let len = keyword.len();
            if body.len() < len
                || !body.is_char_boundary(len)
                || !body[..len].eq_ignore_ascii_case(keyword)
            {
                continue;
            }

            let mut rest = &body[len..];
            if rest
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
            {
                continue;
            }
            if bracketed {
                match rest.strip_prefix(']') {
                    Some(after) => rest = after,
                    None => continue,
                }
            }
            rest = rest.strip_prefix(':').unwrap_or(rest);
            return rest.trim_start();
        }

        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> SeverityClassifier {
        SeverityClassifier::new(&SeverityTable::default()).expect("default table builds")
    }

    #[test]
    fn test_single_keyword_lines() {
        let c = classifier();
        assert_eq!(c.classify("2024-06-25 10:00:22 ERROR Database connection failed"), Severity::Error);
        assert_eq!(c.classify("WARN High CPU usage"), Severity::Warn);
        assert_eq!(c.classify("INFO started"), Severity::Info);
        assert_eq!(c.classify("DEBUG payload"), Severity::Debug);
        assert_eq!(c.classify("CRITICAL memory leak"), Severity::Critical);
    }

    #[test]
    fn test_case_insensitive_substring() {
        let c = classifier();
        assert_eq!(c.classify("connection error while reading"), Severity::Error);
        assert_eq!(c.classify("Warning: disk almost full"), Severity::Warn);
        assert_eq!(c.classify("critical section entered"), Severity::Critical);
    }

    #[test]
    fn test_precedence_when_keywords_co_occur() {
        let c = classifier();
        // CRITICAL > ERROR > WARN > INFO > DEBUG
        assert_eq!(
            c.classify("ERROR [CRITICAL] Memory leak detected in process PID 1234"),
            Severity::Critical
        );
        assert_eq!(c.classify("WARN retrying after ERROR"), Severity::Error);
        assert_eq!(c.classify("INFO previous WARN cleared"), Severity::Warn);
        assert_eq!(c.classify("DEBUG info dump"), Severity::Info);
    }

    #[test]
    fn test_fatal_maps_to_critical() {
        let c = classifier();
        assert_eq!(c.classify("FATAL out of memory"), Severity::Critical);
    }

    #[test]
    fn test_no_keyword_is_unknown() {
        let c = classifier();
        assert_eq!(c.classify("something happened"), Severity::Unknown);
        assert_eq!(c.classify(""), Severity::Unknown);
    }

    #[test]
    fn test_custom_table_order_changes_precedence() {
        let table = SeverityTable::new(vec![
            SeverityRule::new(Severity::Warn, &["WARN"]),
            SeverityRule::new(Severity::Error, &["ERROR"]),
        ]);
        let c = SeverityClassifier::new(&table).unwrap();
        assert_eq!(c.classify("ERROR then WARN"), Severity::Warn);
    }

    #[test]
    fn test_empty_table_classifies_unknown() {
        let c = SeverityClassifier::new(&SeverityTable::new(Vec::new())).unwrap();
        assert_eq!(c.classify("ERROR everywhere"), Severity::Unknown);
    }

    #[test]
    fn test_strip_leading_keyword_forms() {
        let c = classifier();
        assert_eq!(c.strip_leading_keyword("ERROR Database down"), "Database down");
        assert_eq!(c.strip_leading_keyword("[WARN] cpu high"), "cpu high");
        assert_eq!(c.strip_leading_keyword("warning: disk low"), "disk low");
        assert_eq!(c.strip_leading_keyword("  INFO:ready"), "ready");
    }

    #[test]
    fn test_strip_leading_keyword_keeps_non_markers() {
        let c = classifier();
        assert_eq!(c.strip_leading_keyword("ERRORS were found"), "ERRORS were found");
        assert_eq!(c.strip_leading_keyword("[ERROR missing bracket"), "[ERROR missing bracket");
        assert_eq!(c.strip_leading_keyword("User ERROR later"), "User ERROR later");
    }
}
