//! 对话分派循环
//!
//! Plan -> 解析 -> (工具调用 -> Observation -> 下一轮 Plan)* -> 最终回复。
//! 工具失败作为 "Error: ..." Observation 回填给 LLM；格式错误与幻觉工具交给 RecoveryEngine 带提示重试；
//! LLM 调用失败终止本轮。

use crate::core::{AgentError, RecoveryAction, RecoveryEngine};
use crate::memory::Message;
use crate::react::planner::{parse_llm_output, PlannerOutput, Planner};
use crate::tools::ToolExecutor;

/// 单轮默认最大步数
pub const MAX_REACT_STEPS: usize = 15;

/// Observation 日志预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 一轮对话的结果
#[derive(Debug, Clone)]
pub struct ReactResult {
    /// 最终回复
    pub response: String,
    /// 本轮消耗的 LLM 规划次数
    pub steps: usize,
    /// 本轮依次调用的工具名
    pub tool_calls: Vec<String>,
    /// 本轮 prompt token 消耗
    pub prompt_tokens: u64,
    /// 本轮 completion token 消耗
    pub completion_tokens: u64,
}

/// 循环所需的组件
pub struct DispatchSession<'a> {
    pub planner: &'a Planner,
    pub executor: &'a ToolExecutor,
    pub recovery: &'a RecoveryEngine,
    pub max_steps: usize,
}

impl<'a> DispatchSession<'a> {
    pub fn new(planner: &'a Planner, executor: &'a ToolExecutor, recovery: &'a RecoveryEngine) -> Self {
        Self {
            planner,
            executor,
            recovery,
            max_steps: MAX_REACT_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// 处理一条用户输入直至得到最终回复
///
/// history 为此前若干轮的 user/assistant 消息（不含 system）。工具调用与 Observation 只存在于本轮的
/// scratchpad 中，不会写回 history。
pub async fn dispatch_loop(
    session: &DispatchSession<'_>,
    history: &[Message],
    user_input: &str,
) -> Result<ReactResult, AgentError> {
    let mut scratchpad: Vec<Message> = history.to_vec();
    scratchpad.push(Message::user(user_input.to_string()));

    let mut tool_calls = Vec::new();
    let mut last_output = String::new();
    let (init_prompt, init_completion, _) = session.planner.token_usage();
    let usage_delta = || {
        let (prompt, completion, _) = session.planner.token_usage();
        (
            prompt.saturating_sub(init_prompt),
            completion.saturating_sub(init_completion),
        )
    };

    for step in 0..session.max_steps {
        let output = match session.planner.plan(&scratchpad).await {
            Ok(o) => o,
            Err(e) => {
                tracing::warn!(step, error = %e, "Planning failed; aborting turn");
                return Err(e);
            }
        };
        last_output = output.clone();

        match parse_llm_output(&output) {
            Ok(PlannerOutput::Response(response)) => {
                tracing::debug!(step, tools = tool_calls.len(), "Final answer");
                let (prompt_tokens, completion_tokens) = usage_delta();
                return Ok(ReactResult {
                    response,
                    steps: step + 1,
                    tool_calls,
                    prompt_tokens,
                    completion_tokens,
                });
            }
            Ok(PlannerOutput::ToolCall(tc)) => {
                tracing::debug!(step, tool = %tc.tool, "Tool call");
                scratchpad.push(Message::assistant(output));
                let observation = match session.executor.execute(&tc.tool, tc.args).await {
                    Ok(content) => {
                        tool_calls.push(tc.tool.clone());
                        content
                    }
                    Err(e) => match session.recovery.handle(&e, &session.executor.tool_names()) {
                        RecoveryAction::RetryWithPrompt(prompt) => prompt,
                        RecoveryAction::Abort => {
                            tool_calls.push(tc.tool.clone());
                            format!("Error: {e}")
                        }
                    },
                };
                if observation.chars().count() > OBSERVATION_PREVIEW_CHARS {
                    let preview: String = observation.chars().take(OBSERVATION_PREVIEW_CHARS).collect();
                    tracing::debug!(tool = %tc.tool, observation = %format!("{preview}..."), "Observation");
                } else {
                    tracing::debug!(tool = %tc.tool, observation = %observation, "Observation");
                }
                scratchpad.push(Message::user(format!(
                    "Observation from {}: {}",
                    tc.tool, observation
                )));
            }
            Err(e) => match session.recovery.handle(&e, &session.executor.tool_names()) {
                RecoveryAction::RetryWithPrompt(prompt) => {
                    tracing::warn!(step, error = %e, "Malformed tool call; retrying");
                    scratchpad.push(Message::assistant(output));
                    scratchpad.push(Message::user(prompt));
                }
                RecoveryAction::Abort => return Err(e),
            },
        }
    }

    tracing::warn!(max_steps = session.max_steps, "Step limit reached");
    let (prompt_tokens, completion_tokens) = usage_delta();
    Ok(ReactResult {
        response: format!(
            "Reached the maximum number of steps ({}). Last output:\n{}",
            session.max_steps, last_output
        ),
        steps: session.max_steps,
        tool_calls,
        prompt_tokens,
        completion_tokens,
    })
}
