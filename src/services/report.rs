//! 报告导出（Markdown / HTML）
//!
//! 两种格式来自同一个 [`AnalysisReport`]。HTML 报告是自包含文档，
//! 摘要正文原样转义后放在保留空白的块中。

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::str::FromStr;

use crate::models::{AnalysisReport, Severity, SummaryOutcome};

/// 下载文件名后缀
const FILE_SUFFIX: &str = "_log_summary";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const HTML_STYLE: &str = "\
body { font-family: 'Inter', sans-serif; line-height: 1.6; margin: 20px; color: #333; }
h1, h2, h3 { color: #2E86C1; }
h2 { border-bottom: 1px solid #eee; padding-bottom: 5px; margin-top: 30px; }
pre { background-color: #f4f4f4; padding: 10px; border-radius: 5px; overflow-x: auto; }
.summary { white-space: pre-wrap; font-family: inherit; }
.failure { border-left: 4px solid #C0392B; }
table { border-collapse: collapse; }
th, td { border: 1px solid #ddd; padding: 4px 12px; text-align: left; }
.sev-CRITICAL { color: #8B0000; }
.sev-ERROR { color: #FF0000; }
.sev-WARN { color: #FFA500; }
.sev-INFO { color: #1E90FF; }
.sev-DEBUG { color: #32CD32; }
.sev-UNKNOWN { color: #808080; }
";

/// 报告格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Markdown,
    Html,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Html => "html",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "text/markdown",
            ReportFormat::Html => "text/html",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Markdown => f.write_str("markdown"),
            ReportFormat::Html => f.write_str("html"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "html" | "htm" => Ok(ReportFormat::Html),
            other => Err(format!("Unsupported report format: {}", other)),
        }
    }
}

/// 渲染报告
pub fn render(report: &AnalysisReport, format: ReportFormat) -> String {
    match format {
        ReportFormat::Markdown => render_markdown(report),
        ReportFormat::Html => render_html(report),
    }
}

/// 下载文件名：`<stem>_log_summary.<ext>`
///
/// 去掉末尾的 `.log`/`.txt`，并清理路径分隔符等非法字符。
pub fn download_file_name(source_name: &str, format: ReportFormat) -> String {
    let base = source_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source_name);
    let lower = base.to_ascii_lowercase();
    let stem = if lower.ends_with(".log") || lower.ends_with(".txt") {
        &base[..base.len() - 4]
    } else {
        base
    };

    let mut stem = sanitize_filename::sanitize(stem);
    if stem.trim().is_empty() {
        stem = "log".to_string();
    }
    format!("{}{}.{}", stem, FILE_SUFFIX, format.extension())
}

/// `data:<mime>;base64,<payload>` 形式的下载链接
pub fn data_url(content: &str, format: ReportFormat) -> String {
    format!(
        "data:{};base64,{}",
        format.mime_type(),
        STANDARD.encode(content.as_bytes())
    )
}

fn render_markdown(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Log Summary: {}", report.source_name);
    let _ = writeln!(out);
    let _ = writeln!(out, "- Analysis ID: `{}`", report.analysis_id);
    let _ = writeln!(out, "- Generated at: {}", report.generated_at.format(TIME_FORMAT));
    let _ = writeln!(out, "- Encoding: {}", report.encoding);
    if let Some(model) = report.summary.model() {
        let _ = writeln!(out, "- Model: {}", model);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    match &report.summary.outcome {
        SummaryOutcome::Exhausted { diagnostic } => {
            let _ = writeln!(out, "> **Summary unavailable.**");
            for line in diagnostic.lines() {
                let _ = writeln!(out, "> {}", line);
            }
        }
        _ => {
            let _ = writeln!(out, "{}", report.summary.text().trim_end());
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Severity Breakdown");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Severity | Count |");
    let _ = writeln!(out, "|---|---|");
    for (severity, count) in report.chart.tallies.iter_ordered() {
        let _ = writeln!(out, "| {} | {} |", severity, count);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Timeline");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Events with timestamp: {}", report.chart.timed.len());
    let _ = writeln!(out, "- Events without timestamp: {}", report.chart.untimed.len());
    if let Some((first, last)) = report.chart.time_range() {
        let _ = writeln!(
            out,
            "- Time range: {} to {}",
            first.format(TIME_FORMAT),
            last.format(TIME_FORMAT)
        );
    }
    if report.notable.truncated() {
        let _ = writeln!(
            out,
            "- Only the first {} of {} notable lines were summarized.",
            report.notable.len(),
            report.notable.total_notable
        );
    }

    out
}

fn render_html(report: &AnalysisReport) -> String {
    let title = escape_html(&report.source_name);
    let mut out = String::new();

    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, "<html lang=\"en\">");
    let _ = writeln!(out, "<head>");
    let _ = writeln!(out, "<meta charset=\"UTF-8\">");
    let _ = writeln!(
        out,
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">"
    );
    let _ = writeln!(out, "<title>Log Summary - {}</title>", title);
    let _ = writeln!(out, "<style>\n{}</style>", HTML_STYLE);
    let _ = writeln!(out, "</head>");
    let _ = writeln!(out, "<body>");
    let _ = writeln!(out, "<h1>Log Summary: {}</h1>", title);
    let _ = writeln!(out, "<ul>");
    let _ = writeln!(out, "<li>Analysis ID: <code>{}</code></li>", report.analysis_id);
    let _ = writeln!(
        out,
        "<li>Generated at: {}</li>",
        report.generated_at.format(TIME_FORMAT)
    );
    let _ = writeln!(out, "<li>Encoding: {}</li>", escape_html(&report.encoding));
    if let Some(model) = report.summary.model() {
        let _ = writeln!(out, "<li>Model: {}</li>", escape_html(model));
    }
    let _ = writeln!(out, "</ul>");

    let _ = writeln!(out, "<h2>Summary</h2>");
    let class = if report.summary.is_failure() {
        "summary failure"
    } else {
        "summary"
    };
    let _ = writeln!(
        out,
        "<pre class=\"{}\">{}</pre>",
        class,
        escape_html(report.summary.text().trim_end())
    );

    let _ = writeln!(out, "<h2>Severity Breakdown</h2>");
    let _ = writeln!(out, "<table>");
    let _ = writeln!(out, "<tr><th>Severity</th><th>Count</th></tr>");
    for (severity, count) in report.chart.tallies.iter_ordered() {
        let _ = writeln!(
            out,
            "<tr><td class=\"{}\">{}</td><td>{}</td></tr>",
            severity_class(severity),
            severity,
            count
        );
    }
    let _ = writeln!(out, "</table>");

    let _ = writeln!(out, "<h2>Timeline</h2>");
    let _ = writeln!(out, "<ul>");
    let _ = writeln!(out, "<li>Events with timestamp: {}</li>", report.chart.timed.len());
    let _ = writeln!(
        out,
        "<li>Events without timestamp: {}</li>",
        report.chart.untimed.len()
    );
    if let Some((first, last)) = report.chart.time_range() {
        let _ = writeln!(
            out,
            "<li>Time range: {} to {}</li>",
            first.format(TIME_FORMAT),
            last.format(TIME_FORMAT)
        );
    }
    if report.notable.truncated() {
        let _ = writeln!(
            out,
            "<li>Only the first {} of {} notable lines were summarized.</li>",
            report.notable.len(),
            report.notable.total_notable
        );
    }
    let _ = writeln!(out, "</ul>");
    let _ = writeln!(out, "</body>");
    let _ = writeln!(out, "</html>");

    out
}

fn severity_class(severity: Severity) -> String {
    format!("sev-{}", severity.as_str())
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
