use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chart::ChartData;
use super::log_event::{NotableLineSet, ParsedLog};
use super::summary::SummaryResult;

/// 一次上传分析的全部产物
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    /// 上传文件名
    pub source_name: String,
    /// 实际使用的解码方式
    pub encoding: String,
    pub generated_at: DateTime<Utc>,
    pub parsed: ParsedLog,
    pub notable: NotableLineSet,
    pub chart: ChartData,
    pub summary: SummaryResult,
}
