//! Planner：调用 LLM 并把输出解析为工具调用或最终回复
//!
//! 工具调用协议为纯文本 JSON：`{"tool": "<Name>", "args": ...}`，可包在 ```json 代码块中。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentError;
use crate::llm::{LlmClient, SamplingConfig};
use crate::memory::Message;

/// LLM 请求的工具调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannerOutput {
    /// 直接回复用户
    Response(String),
    /// 需要执行工具
    ToolCall(ToolCall),
}

/// 解析 LLM 输出
///
/// - ```json 代码块或以 `{` 开头的输出：先按任意 JSON 解析；只有带非空字符串 `tool` 的对象
///   （或带 `name` 与 `args`/`arguments` 的对象）才是工具调用，其它合法 JSON 作为回复
/// - 上述候选不是合法 JSON 且含 `"tool"` 键：JsonParseError
/// - 正文中夹带的 `{...}`：能解析为工具调用才算，否则整段作为回复
pub fn parse_llm_output(output: &str) -> Result<PlannerOutput, AgentError> {
    let trimmed = output.trim();

    let candidate = fenced_json(trimmed).or_else(|| {
        trimmed
            .starts_with('{')
            .then(|| &trimmed[..trimmed.rfind('}').map_or(trimmed.len(), |i| i + 1)])
    });
    if let Some(json_str) = candidate {
        return match serde_json::from_str::<Value>(json_str) {
            Ok(value) => Ok(tool_call_from_value(value)
                .map_or_else(|| PlannerOutput::Response(trimmed.to_string()), PlannerOutput::ToolCall)),
            Err(e) if json_str.contains("\"tool\"") => {
                Err(AgentError::JsonParseError(format!("{e}: {json_str}")))
            }
            Err(_) => Ok(PlannerOutput::Response(trimmed.to_string())),
        };
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Some(tc) = serde_json::from_str::<Value>(&trimmed[start..=end])
                .ok()
                .and_then(tool_call_from_value)
            {
                return Ok(PlannerOutput::ToolCall(tc));
            }
        }
    }
    Ok(PlannerOutput::Response(trimmed.to_string()))
}

fn fenced_json(text: &str) -> Option<&str> {
    let start = text.find("```json")?;
    let rest = &text[start + "```json".len()..];
    Some(rest.find("```").map_or(rest, |end| &rest[..end]).trim())
}

/// JSON 值 -> 工具调用；控制项、审阅结果等普通对象返回 None
fn tool_call_from_value(value: Value) -> Option<ToolCall> {
    let Value::Object(mut obj) = value else {
        return None;
    };
    let args_key = ["args", "arguments"].into_iter().find(|k| obj.contains_key(*k));
    let tool = match obj.remove("tool") {
        Some(v) => v,
        // `name` 在控制项里也可能出现，只有同时带参数键时才视为工具名
        None if args_key.is_some() => obj.remove("name")?,
        None => return None,
    };
    let tool = match tool {
        Value::String(s) if !s.trim().is_empty() => s,
        _ => return None,
    };
    let args = args_key.and_then(|k| obj.remove(k)).unwrap_or(Value::Null);
    Some(ToolCall { tool, args })
}

/// Planner：持有 LLM 与 system prompt；plan 时把 system 放在消息最前
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn sampling(&self) -> SamplingConfig {
        self.llm.sampling()
    }

    /// LLM 累计 token 使用 (prompt, completion, total)
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    pub async fn plan(&self, messages: &[Message]) -> Result<String, AgentError> {
        let mut full = Vec::with_capacity(messages.len() + 1);
        full.push(Message::system(self.system_prompt.clone()));
        full.extend_from_slice(messages);
        Ok(self.llm.complete(&full).await?)
    }
}
