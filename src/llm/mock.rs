//! Mock LLM 客户端（用于离线运行与测试，无需 API）
//!
//! - MockLlmClient：无 API Key 时使用，直接回显最后一条 user 消息作为最终回复
//! - ScriptedLlmClient：按队列返回预设回复，记录每次收到的消息与调用次数，并按字符数估算 token 用量

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, SamplingConfig, TokenUsage};
use crate::memory::{Message, Role};

/// MockLlmClient 报告的模型名
pub const MOCK_MODEL: &str = "mock";

/// 回显预览最大字符数
const ECHO_PREVIEW_CHARS: usize = 200;

/// 估算 token：约 4 字符一个
fn estimate_tokens(text: &str) -> u64 {
    text.chars().count().div_ceil(4) as u64
}

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        let preview: String = last_user.trim().chars().take(ECHO_PREVIEW_CHARS).collect();
        Ok(format!("Echo from Mock: {preview}"))
    }

    fn sampling(&self) -> SamplingConfig {
        SamplingConfig {
            model: MOCK_MODEL.to_string(),
            ..SamplingConfig::default()
        }
    }
}

/// 脚本化客户端：依次弹出预设回复；队列为空时返回 fallback
#[derive(Debug)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: String,
    calls: AtomicUsize,
    received: Mutex<Vec<Vec<Message>>>,
    usage: TokenUsage,
}

impl Default for ScriptedLlmClient {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            fallback: "mock reply".to_string(),
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
            usage: TokenUsage::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// 追加一次失败回复
    pub fn push_error(&self, err: LlmError) {
        self.lock_replies().push_back(Err(err));
    }

    /// 已发生的 complete 调用次数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 每次调用收到的完整消息列表
    pub fn received(&self) -> Vec<Vec<Message>> {
        self.received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// 每次调用中最后一条消息的内容（单 prompt 生成时即渲染后的模板）
    pub fn prompts(&self) -> Vec<String> {
        self.received()
            .iter()
            .filter_map(|msgs| msgs.last().map(|m| m.content.clone()))
            .collect()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, LlmError>>> {
        self.replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(messages.to_vec());
        let reply = self
            .lock_replies()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))?;
        let prompt_tokens: u64 = messages.iter().map(|m| estimate_tokens(&m.content)).sum();
        self.usage.add(prompt_tokens, estimate_tokens(&reply));
        Ok(reply)
    }

    fn sampling(&self) -> SamplingConfig {
        SamplingConfig {
            model: "scripted".to_string(),
            ..SamplingConfig::default()
        }
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }
}
