//! 时间线图表数据
//!
//! 交给外部图表组件的数据契约：`(时间戳或缺失, 级别, 原始行)` 序列。
//! 没有时间戳的事件单独放在 `untimed` 中，不参与时间轴排序，但计入级别统计。

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::log_event::Severity;

/// 图表上的一个点
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChartPoint {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<NaiveDateTime>,
    pub severity: Severity,
    pub raw_text: Arc<str>,
    pub line_number: usize,
}

/// 各级别事件计数
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SeverityCounts(BTreeMap<Severity, usize>);

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        *self.0.entry(severity).or_insert(0) += 1;
    }

    pub fn get(&self, severity: Severity) -> usize {
        self.0.get(&severity).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// 按从高到低的级别顺序列出（含计数为 0 的级别）
    pub fn iter_ordered(&self) -> impl Iterator<Item = (Severity, usize)> + '_ {
        Severity::ALL.iter().map(move |s| (*s, self.get(*s)))
    }
}

/// 图表数据
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ChartData {
    /// 按时间戳升序（相同时间戳保持文件顺序）
    pub timed: Vec<ChartPoint>,
    /// 无时间戳的事件，保持文件顺序
    pub untimed: Vec<ChartPoint>,
    pub tallies: SeverityCounts,
}

impl ChartData {
    /// 完整的契约序列：先时间轴上的点，再无时间戳的点
    pub fn points(&self) -> impl Iterator<Item = &ChartPoint> {
        self.timed.iter().chain(self.untimed.iter())
    }

    pub fn len(&self) -> usize {
        self.timed.len() + self.untimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 时间范围（首个、末个时间戳）
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.timed.first()?.timestamp?;
        let last = self.timed.last()?.timestamp?;
        Some((first, last))
    }
}
