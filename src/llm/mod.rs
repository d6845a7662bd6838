//! LLM 层：客户端抽象与实现（Anthropic / OpenAI 兼容 / Mock）

pub mod anthropic;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use anthropic::{create_anthropic_client, sampling_from_env, DEFAULT_ANTHROPIC_MODEL};
pub use mock::{MockLlmClient, ScriptedLlmClient, MOCK_MODEL};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError, SamplingConfig};

/// 根据配置与环境变量选择 LLM 后端（Anthropic / OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let has_anthropic = std::env::var("ANTHROPIC_API_KEY").is_ok();
    let has_openai = std::env::var("OPENAI_API_KEY").is_ok();
    let sampling = cfg.llm.sampling();
    let timeout = cfg.llm.timeouts.request;

    match provider.as_str() {
        "mock" => {
            tracing::info!("Using Mock LLM (configured)");
            Arc::new(MockLlmClient)
        }
        "openai" if has_openai => {
            tracing::info!(model = %sampling.model, "Using OpenAI-compatible LLM");
            Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                None,
                sampling,
                timeout,
            ))
        }
        _ if has_anthropic => {
            let client = create_anthropic_client(cfg.llm.base_url.as_deref(), sampling, timeout);
            tracing::info!(model = %client.sampling().model, "Using Anthropic LLM");
            Arc::new(client)
        }
        _ => {
            tracing::warn!(
                "ANTHROPIC_API_KEY not found in environment (provider '{}'); using Mock LLM",
                provider
            );
            Arc::new(MockLlmClient)
        }
    }
}
