//! 摘要客户端
//!
//! 按配置的优先级依次尝试模型，第一个成功返回非空文本的模型胜出。
//! 每个模型最多调用一次，整个过程顺序执行。所有失败都在这里消化，
//! 调用方只会拿到 [`SummaryResult`]。

use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::models::{AttemptRecord, NotableLineSet, SummaryResult};

use super::prompts::build_summary_prompt;

/// 摘要后端错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("API key is not configured (set the {env_var} environment variable)")]
    MissingCredential { env_var: String },

    #[error("API key is not a valid header value")]
    InvalidCredential,

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication rejected (HTTP {status})")]
    Authentication { status: u16 },

    #[error("quota exceeded or rate limited")]
    QuotaExceeded,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// 文本生成后端
///
/// 实现方负责一次完整的远程调用；重试与回退由 [`SummarizationClient`] 负责。
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// 后端名称，仅用于日志
    fn name(&self) -> &str;

    /// 调用前的就绪检查（例如凭据是否存在）
    fn readiness(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// 用指定模型生成文本
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, BackendError>;

    /// 列出后端可用的文本生成模型，默认不支持发现
    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl<T: SummaryBackend + ?Sized> SummaryBackend for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn readiness(&self) -> Result<(), BackendError> {
        (**self).readiness()
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, BackendError> {
        (**self).generate(model, prompt).await
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        (**self).list_models().await
    }
}

/// 带模型回退链的摘要客户端
pub struct SummarizationClient<B> {
    backend: B,
    models: Vec<String>,
    discover: bool,
}

impl<B: SummaryBackend> SummarizationClient<B> {
    pub fn new(backend: B, models: Vec<String>) -> Self {
        Self {
            backend,
            models,
            discover: false,
        }
    }

    /// 启用后，后端列出的模型追加在配置的模型之后
    pub fn with_discovery(mut self, discover: bool) -> Self {
        self.discover = discover;
        self
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 生成摘要
    ///
    /// - 输入中没有关键行：返回固定文案，不调用后端
    /// - 有关键行但一行都没有入选（上限为 0）：返回失败诊断，不调用后端
    /// - 后端未就绪或模型链为空：返回失败诊断，不调用后端
    /// - 否则按顺序尝试模型，直到某个模型返回非空文本
    pub async fn summarize(&self, notable: &NotableLineSet) -> SummaryResult {
        if notable.total_notable == 0 {
            tracing::info!("No notable lines, skipping summarization");
            return SummaryResult::no_issues();
        }

        if notable.is_empty() {
            tracing::warn!(
                total_notable = notable.total_notable,
                cap = notable.cap,
                "Notable lines found but none selected"
            );
            return SummaryResult::exhausted(
                format!(
                    "Summarization unavailable: {} notable line(s) found but the line cap is {}",
                    notable.total_notable, notable.cap
                ),
                Vec::new(),
            );
        }

        if let Err(e) = self.backend.readiness() {
            tracing::warn!(backend = self.backend.name(), error = %e, "Summary backend not ready");
            return SummaryResult::exhausted(
                format!("Summarization unavailable: {}", e),
                Vec::new(),
            );
        }

        let chain = self.model_chain().await;
        if chain.is_empty() {
            tracing::warn!("No model identifiers configured");
            return SummaryResult::exhausted(
                "Summarization unavailable: no model identifiers are configured",
                Vec::new(),
            );
        }

        let prompt = build_summary_prompt(notable);
        tracing::debug!(
            backend = self.backend.name(),
            lines = notable.len(),
            models = chain.len(),
            prompt_bytes = prompt.len(),
            "Prompt built"
        );

        let mut attempts = Vec::new();
        for model in &chain {
            let start = Instant::now();
            let result = match self.backend.generate(model, &prompt).await {
                Ok(text) if text.trim().is_empty() => Err(BackendError::MalformedResponse(
                    "model returned empty text".to_string(),
                )),
                other => other,
            };

            match result {
                Ok(text) => {
                    tracing::info!(
                        model = %model,
                        attempt = attempts.len() + 1,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Summary generated"
                    );
                    return SummaryResult::generated(model.clone(), text, attempts);
                }
                Err(e) => {
                    tracing::warn!(
                        model = %model,
                        attempt = attempts.len() + 1,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        error = %e,
                        "Model attempt failed, trying next"
                    );
                    attempts.push(AttemptRecord {
                        model: model.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::error!(attempts = attempts.len(), "All summary models failed");
        let diagnostic = exhausted_diagnostic(&attempts);
        SummaryResult::exhausted(diagnostic, attempts)
    }
}

impl<B: SummaryBackend> SummarizationClient<B> {
    /// 配置的模型在前，发现的模型去重后追加；发现失败只记录告警
    async fn model_chain(&self) -> Vec<String> {
        let mut chain = self.models.clone();
        if !self.discover {
            return chain;
        }

        match self.backend.list_models().await {
            Ok(discovered) => {
                let before = chain.len();
                for model in discovered {
                    if !chain.contains(&model) {
                        chain.push(model);
                    }
                }
                tracing::debug!(added = chain.len() - before, "Model discovery finished");
            }
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), error = %e, "Model discovery failed");
            }
        }
        chain
    }
}

fn exhausted_diagnostic(attempts: &[AttemptRecord]) -> String {
    let mut diagnostic = format!(
        "Summarization failed: all {} configured model(s) returned an error.",
        attempts.len()
    );
    for attempt in attempts {
        let _ = write!(diagnostic, "\n- {}: {}", attempt.model, attempt.error);
    }
    diagnostic
}
