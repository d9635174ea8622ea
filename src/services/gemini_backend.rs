//! Google Generative Language (Gemini) 后端
//!
//! 调用 `POST {endpoint}/models/{model}:generateContent`，
//! 模型发现调用 `GET {endpoint}/models`。
//! 密钥通过 `x-goog-api-key` 请求头发送，不出现在 URL 和日志中。

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::models::config::SummarizerConfig;
use crate::utils::credentials::ApiKey;

use super::summarizer::{BackendError, SummaryBackend};

const API_KEY_HEADER: &str = "x-goog-api-key";
/// 错误响应体保留的最大字符数
const MAX_ERROR_BODY_CHARS: usize = 500;
const LIST_MODELS_PAGE_SIZE: u32 = 1000;
/// 名称中包含这些片段的模型不用于文本生成
const NON_TEXT_MODEL_MARKERS: [&str; 2] = ["embedding", "aqa"];

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize, Debug)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct ListModelsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    supported_generation_methods: Vec<String>,
}

/// Gemini REST 后端
pub struct GeminiBackend {
    client: Client,
    endpoint: String,
    temperature: f32,
    api_key: Option<ApiKey>,
    api_key_env: String,
}

impl GeminiBackend {
    /// 构建后端；`api_key` 缺失时仍可构建，但 [`readiness`](SummaryBackend::readiness) 会失败
    pub fn new(config: &SummarizerConfig, api_key: Option<ApiKey>) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| BackendError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            api_key,
            api_key_env: config.api_key_env.clone(),
        })
    }

    fn url_for(&self, model: &str) -> String {
        let model = model.trim().trim_start_matches("models/");
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }

    fn key_header(&self) -> Result<HeaderValue, BackendError> {
        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| BackendError::MissingCredential {
                env_var: self.api_key_env.clone(),
            })?;
        let mut value =
            HeaderValue::from_str(key.expose()).map_err(|_| BackendError::InvalidCredential)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

#[async_trait]
impl SummaryBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn readiness(&self) -> Result<(), BackendError> {
        self.key_header().map(|_| ())
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, BackendError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        tracing::debug!(model = %model, "Calling generateContent");

        let response = self
            .client
            .post(self.url_for(model))
            .header(API_KEY_HEADER, self.key_header()?)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if let Some(error) = classify_status(status, &text) {
            return Err(error);
        }

        extract_text(&text)
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let response = self
            .client
            .get(format!(
                "{}/models?pageSize={}",
                self.endpoint, LIST_MODELS_PAGE_SIZE
            ))
            .header(API_KEY_HEADER, self.key_header()?)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if let Some(error) = classify_status(status, &text) {
            return Err(error);
        }

        let models = generation_models(&text)?;
        tracing::debug!(count = models.len(), "Listed generateContent models");
        Ok(models)
    }
}

fn map_transport_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout
    } else {
        // without_url 避免把请求地址带进错误信息
        BackendError::Network(error.without_url().to_string())
    }
}

/// 非 2xx 状态码映射为后端错误
fn classify_status(status: StatusCode, body: &str) -> Option<BackendError> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Authentication {
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => BackendError::QuotaExceeded,
        _ => BackendError::Http {
            status: status.as_u16(),
            body: truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS),
        },
    })
}

/// 取第一个带文本的候选，拼接其全部 `parts[].text`
fn extract_text(body: &str) -> Result<String, BackendError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| BackendError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let finish_reason = response
        .candidates
        .first()
        .and_then(|c| c.finish_reason.clone());

    response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .find(|text| !text.trim().is_empty())
        .ok_or_else(|| match finish_reason {
            Some(reason) => {
                BackendError::MalformedResponse(format!("no candidate text (finish reason {})", reason))
            }
            None => BackendError::MalformedResponse("no candidate text".to_string()),
        })
}

/// 支持 `generateContent` 且不是 embedding/aqa 的模型，去掉 `models/` 前缀
fn generation_models(body: &str) -> Result<Vec<String>, BackendError> {
    let response: ListModelsResponse = serde_json::from_str(body)
        .map_err(|e| BackendError::MalformedResponse(format!("invalid model list: {}", e)))?;

    Ok(response
        .models
        .into_iter()
        .filter(|model| {
            model
                .supported_generation_methods
                .iter()
                .any(|method| method == "generateContent")
        })
        .map(|model| model.name.trim_start_matches("models/").to_string())
        .filter(|name| {
            !name.is_empty() && !NON_TEXT_MODEL_MARKERS.iter().any(|marker| name.contains(marker))
        })
        .collect())
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(api_key: Option<&str>) -> GeminiBackend {
        GeminiBackend::new(
            &SummarizerConfig::default(),
            api_key.and_then(ApiKey::new),
        )
        .unwrap()
    }

    #[test]
    fn test_url_for_model() {
        let b = backend(Some("k"));
        assert_eq!(
            b.url_for("gemini-pro"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
        );
        assert_eq!(
            b.url_for("models/gemini-1.0-pro"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.0-pro:generateContent"
        );
    }

    #[test]
    fn test_readiness_requires_key() {
        assert!(backend(Some("k")).readiness().is_ok());
        assert_eq!(
            backend(None).readiness(),
            Err(BackendError::MissingCredential {
                env_var: "GOOGLE_API_KEY".into()
            })
        );
    }

    #[test]
    fn test_key_header_is_sensitive() {
        let header = backend(Some("secret")).key_header().unwrap();
        assert!(header.is_sensitive());
        assert!(!format!("{:?}", header).contains("secret"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: "hello" }],
            }],
            generation_config: GenerationConfig { temperature: 0.2 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert!(json["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK, ""), None);
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN, ""),
            Some(BackendError::Authentication { status: 403 })
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            Some(BackendError::QuotaExceeded)
        );
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND, " model not found "),
            Some(BackendError::Http {
                status: 404,
                body: "model not found".into()
            })
        );
    }

    #[test]
    fn test_error_body_truncated() {
        let long = "x".repeat(2000);
        match classify_status(StatusCode::INTERNAL_SERVER_ERROR, &long) {
            Some(BackendError::Http { body, .. }) => {
                assert_eq!(body.chars().count(), MAX_ERROR_BODY_CHARS + 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{ "text": "### Timeline" }, { "text": " ok" }],
                    "role": "model"
                },
                "finishReason": "STOP"
            }]
        })
        .to_string();
        assert_eq!(extract_text(&body).unwrap(), "### Timeline ok");
    }

    #[test]
    fn test_extract_text_skips_empty_candidates() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"},{"content":{"parts":[{"text":"second"}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "second");
    }

    #[test]
    fn test_extract_text_malformed() {
        assert!(matches!(
            extract_text("not json"),
            Err(BackendError::MalformedResponse(_))
        ));
        match extract_text(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#) {
            Err(BackendError::MalformedResponse(msg)) => assert!(msg.contains("SAFETY")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(extract_text("{}").is_err());
    }

    #[test]
    fn test_generation_models_filters_list() {
        let body = serde_json::json!({
            "models": [
                { "name": "models/gemini-1.5-flash-latest", "supportedGenerationMethods": ["generateContent", "countTokens"] },
                { "name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"] },
                { "name": "models/embedding-gecko", "supportedGenerationMethods": ["generateContent"] },
                { "name": "models/aqa", "supportedGenerationMethods": ["generateAnswer", "generateContent"] },
                { "name": "models/gemini-pro" }
            ]
        })
        .to_string();
        assert_eq!(
            generation_models(&body).unwrap(),
            vec!["gemini-1.5-flash-latest"]
        );
        assert!(generation_models("{}").unwrap().is_empty());
        assert!(matches!(
            generation_models("not json"),
            Err(BackendError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_list_models_without_key_fails_before_request() {
        assert_eq!(
            backend(None).list_models().await,
            Err(BackendError::MissingCredential {
                env_var: "GOOGLE_API_KEY".into()
            })
        );
    }
}
