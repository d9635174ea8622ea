//! 摘要结果数据结构
//!
//! 回退链的三种终态：生成成功、无需摘要、全部模型失败。

use serde::{Deserialize, Serialize};

/// 没有值得关注的行时返回的固定文案
pub const NO_ISSUES_MESSAGE: &str =
    "No significant errors or warnings found in the provided log file.";

/// 单次失败的调用记录
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AttemptRecord {
    pub model: String,
    pub error: String,
}

/// 摘要终态
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummaryOutcome {
    /// 某个模型成功返回了文本
    Generated { model: String, text: String },
    /// 没有值得关注的行，未发起任何调用
    NoIssues { message: String },
    /// 所有模型均失败（或后端未就绪）
    Exhausted { diagnostic: String },
}

/// 摘要结果，生成后不再修改
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SummaryResult {
    pub outcome: SummaryOutcome,
    /// 失败的调用记录，按尝试顺序
    #[serde(default)]
    pub attempts: Vec<AttemptRecord>,
}

impl SummaryResult {
    pub fn generated(
        model: impl Into<String>,
        text: impl Into<String>,
        attempts: Vec<AttemptRecord>,
    ) -> Self {
        Self {
            outcome: SummaryOutcome::Generated {
                model: model.into(),
                text: text.into(),
            },
            attempts,
        }
    }

    pub fn no_issues() -> Self {
        Self {
            outcome: SummaryOutcome::NoIssues {
                message: NO_ISSUES_MESSAGE.to_string(),
            },
            attempts: Vec::new(),
        }
    }

    pub fn exhausted(diagnostic: impl Into<String>, attempts: Vec<AttemptRecord>) -> Self {
        Self {
            outcome: SummaryOutcome::Exhausted {
                diagnostic: diagnostic.into(),
            },
            attempts,
        }
    }

    /// 展示给用户的正文：生成文本、固定文案或诊断信息
    pub fn text(&self) -> &str {
        match &self.outcome {
            SummaryOutcome::Generated { text, .. } => text,
            SummaryOutcome::NoIssues { message } => message,
            SummaryOutcome::Exhausted { diagnostic } => diagnostic,
        }
    }

    /// 成功生成摘要的模型
    pub fn model(&self) -> Option<&str> {
        match &self.outcome {
            SummaryOutcome::Generated { model, .. } => Some(model),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, SummaryOutcome::Exhausted { .. })
    }

    /// 实际发起的后端调用次数（失败次数 + 成功的那一次）
    pub fn attempt_count(&self) -> usize {
        match self.outcome {
            SummaryOutcome::Generated { .. } => self.attempts.len() + 1,
            _ => self.attempts.len(),
        }
    }
}
