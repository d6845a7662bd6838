//! LLM 客户端抽象
//!
//! 所有后端（Anthropic / OpenAI 兼容 / Mock）实现 LlmClient：complete 为阻塞式（对调用方而言）非流式完成。
//! 采样参数（模型、温度、最大输出长度）在启动时确定，作为每次调用的固定输入。

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::memory::Message;

/// LLM 调用错误
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),
}

/// 采样配置：进程级固定参数
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SamplingConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            model: crate::llm::anthropic::DEFAULT_ANTHROPIC_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: 4096,
        }
    }
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 单条 prompt 生成（模板渲染结果直接作为 user 消息）
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(&[Message::user(prompt)]).await
    }

    /// 当前采样配置（供自省与日志）
    fn sampling(&self) -> SamplingConfig {
        SamplingConfig::default()
    }

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
