//! 时间线图表数据构建

use crate::models::{ChartData, ChartPoint, LogEvent, SeverityCounts};

/// 由结构化事件生成图表数据
///
/// 有时间戳的点按时间升序排列（稳定排序，相同时间保持文件顺序），
/// 没有时间戳的点单独存放；级别统计覆盖全部事件。
pub fn build_chart_data(events: &[LogEvent]) -> ChartData {
    let mut tallies = SeverityCounts::default();
    let mut timed = Vec::new();
    let mut untimed = Vec::new();

    for event in events {
        tallies.record(event.severity);
        let point = ChartPoint {
            timestamp: event.timestamp,
            severity: event.severity,
            raw_text: event.raw_text.clone(),
            line_number: event.line_number,
        };
        if point.timestamp.is_some() {
            timed.push(point);
        } else {
            untimed.push(point);
        }
    }

    timed.sort_by_key(|point| point.timestamp);

    ChartData {
        timed,
        untimed,
        tallies,
    }
}
