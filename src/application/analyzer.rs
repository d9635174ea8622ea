//! 日志分析用例
//!
//! 一次上传对应一次 [`Analyzer::analyze`]：
//! 解码 → 提取关键行 / 构建结构化事件 → 图表数据 → 摘要。
//! 图表数据在摘要之前生成，摘要失败不影响图表。

use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::models::{AnalysisReport, AppConfig};
use crate::services::{
    build_chart_data, build_events, extract_notable, ExtractOptions, SeverityClassifier,
    SeverityTable, SummarizationClient, SummaryBackend,
};
use crate::utils::decode_input;

/// 建议的上传文件扩展名
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["log", "txt"];

/// 文件名是否带有 `.log`/`.txt` 扩展名（大小写不敏感）
pub fn has_supported_extension(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// 日志分析服务
pub struct Analyzer<B> {
    classifier: SeverityClassifier,
    options: ExtractOptions,
    client: SummarizationClient<B>,
}

impl<B: SummaryBackend> Analyzer<B> {
    /// 根据配置构建分析服务
    ///
    /// # 错误
    /// 配置未通过校验时返回校验错误；级别关键词表无法编译时返回配置错误
    pub fn new(config: &AppConfig, backend: B) -> Result<Self> {
        config.validate()?;

        let table = SeverityTable::from_config(&config.severity);
        let classifier = SeverityClassifier::new(&table)?;

        Ok(Self {
            classifier,
            options: ExtractOptions::from(&config.extractor),
            client: SummarizationClient::new(backend, config.summarizer.models.clone())
                .with_discovery(config.summarizer.discover_models),
        })
    }

    pub fn classifier(&self) -> &SeverityClassifier {
        &self.classifier
    }

    pub fn client(&self) -> &SummarizationClient<B> {
        &self.client
    }

    /// 分析一次上传的内容
    ///
    /// 不会失败：解码尽力而为，解析是全函数，摘要失败体现在结果中。
    pub async fn analyze(&self, bytes: &[u8], source_name: &str) -> AnalysisReport {
        let analysis_id = Uuid::new_v4();
        let span = tracing::info_span!("analysis", %analysis_id, source = %source_name);

        async move {
            let decoded = decode_input(bytes);
            if decoded.had_errors {
                tracing::warn!(encoding = decoded.encoding, "Input was not clean UTF-8");
            }

            let notable = extract_notable(&decoded.text, &self.classifier, self.options);
            let parsed = build_events(&decoded.text, &self.classifier);
            let chart = build_chart_data(&parsed.events);

            tracing::info!(
                bytes = bytes.len(),
                events = parsed.events.len(),
                notable = notable.total_notable,
                sent = notable.len(),
                unparsed_timestamps = parsed.warnings.len(),
                "Log parsed"
            );

            let summary = self.client.summarize(&notable).await;

            AnalysisReport {
                analysis_id,
                source_name: source_name.to_string(),
                encoding: decoded.encoding.to_string(),
                generated_at: Utc::now(),
                parsed,
                notable,
                chart,
                summary,
            }
        }
        .instrument(span)
        .await
    }
}
