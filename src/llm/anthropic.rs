//! Anthropic 客户端（经 OpenAI 兼容端点）
//!
//! - Base URL: https://api.anthropic.com/v1/
//! - API Key: `ANTHROPIC_API_KEY`
//! - 采样参数可由 `ANTHROPIC_MODEL_NAME` / `ANTHROPIC_TEMPERATURE` / `ANTHROPIC_MAX_TOKENS` 覆盖

use crate::llm::{OpenAiClient, SamplingConfig};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1/";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";

/// 用 ANTHROPIC_* 环境变量覆盖采样配置；解析失败的值忽略并 warn
pub fn sampling_from_env(base: SamplingConfig) -> SamplingConfig {
    let mut sampling = base;
    if let Ok(model) = std::env::var("ANTHROPIC_MODEL_NAME") {
        if !model.trim().is_empty() {
            sampling.model = model.trim().to_string();
        }
    }
    if let Ok(raw) = std::env::var("ANTHROPIC_TEMPERATURE") {
        match raw.trim().parse::<f32>() {
            Ok(t) => sampling.temperature = t,
            Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring ANTHROPIC_TEMPERATURE"),
        }
    }
    if let Ok(raw) = std::env::var("ANTHROPIC_MAX_TOKENS") {
        match raw.trim().parse::<u32>() {
            Ok(n) => sampling.max_tokens = n,
            Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring ANTHROPIC_MAX_TOKENS"),
        }
    }
    sampling
}

/// 创建 Anthropic 客户端；base_url 为 None 时使用官方端点
pub fn create_anthropic_client(
    base_url: Option<&str>,
    sampling: SamplingConfig,
    request_timeout_secs: u64,
) -> OpenAiClient {
    let api_key = std::env::var("ANTHROPIC_API_KEY").ok();
    OpenAiClient::new(
        Some(base_url.unwrap_or(ANTHROPIC_BASE_URL)),
        api_key.as_deref(),
        sampling_from_env(sampling),
        request_timeout_secs,
    )
}
