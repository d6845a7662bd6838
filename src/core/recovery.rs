//! 错误恢复引擎
//!
//! 根据 AgentError 类型返回 RecoveryAction，供对话循环决定是带提示重试还是终止本轮。

use crate::core::{AgentError, RecoveryAction};

/// 语义化错误恢复：将错误映射为可执行动作
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    /// tool_names：当前可用工具名，用于幻觉工具时提示 LLM
    pub fn handle(&self, err: &AgentError, tool_names: &[String]) -> RecoveryAction {
        match err {
            AgentError::JsonParseError(raw) => RecoveryAction::RetryWithPrompt(format!(
                "Your previous output contained malformed tool-call JSON: {raw}. \
                To call a tool, output exactly one JSON object and nothing else, \
                in the form {{\"tool\": \"<ToolName>\", \"args\": {{...}}}}. \
                To answer the user, reply with plain text and no JSON object."
            )),
            AgentError::HallucinatedTool(name) => RecoveryAction::RetryWithPrompt(format!(
                "There is no tool named '{name}'. Available tools: {}. \
                Use one of these or answer the user directly.",
                tool_names.join(", ")
            )),
            AgentError::ToolExecutionFailed(_)
            | AgentError::ToolTimeout(_)
            | AgentError::LlmError(_) => RecoveryAction::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;

    #[test]
    fn test_recovery_json_parse_error() {
        let engine = RecoveryEngine::new();
        let err = AgentError::JsonParseError("invalid json".to_string());
        match engine.handle(&err, &[]) {
            RecoveryAction::RetryWithPrompt(msg) => assert!(msg.contains("JSON")),
            other => panic!("Expected RetryWithPrompt, got {other:?}"),
        }
    }

    #[test]
    fn test_recovery_hallucinated_tool_lists_tools() {
        let engine = RecoveryEngine::new();
        let err = AgentError::HallucinatedTool("DeleteControls".to_string());
        let tools = vec!["FilterControls".to_string(), "ExplainMethods".to_string()];
        match engine.handle(&err, &tools) {
            RecoveryAction::RetryWithPrompt(msg) => {
                assert!(msg.contains("DeleteControls"));
                assert!(msg.contains("FilterControls, ExplainMethods"));
            }
            other => panic!("Expected RetryWithPrompt, got {other:?}"),
        }
    }

    #[test]
    fn test_recovery_llm_error_aborts() {
        let engine = RecoveryEngine::new();
        let err = AgentError::LlmError(LlmError::Timeout(120));
        assert!(matches!(engine.handle(&err, &[]), RecoveryAction::Abort));
    }

    #[test]
    fn test_recovery_tool_timeout_aborts() {
        let engine = RecoveryEngine::new();
        let err = AgentError::ToolTimeout("BatchReviewControls".to_string());
        assert!(matches!(engine.handle(&err, &[]), RecoveryAction::Abort));
    }
}
