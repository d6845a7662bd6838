//! 内置 Prompt：四个分析模板与对话系统提示词

use crate::prompts::PromptKey;

pub const DEFAULT_5W: &str = "
You are a control-review expert. Perform a comprehensive 5W analysis (Who, What, Where, When, and Why) for the given control, including context, scope, and impact:

{control}
";

pub const DEFAULT_OE: &str = "
You are an AI specialized in control assessments. Evaluate the operational effectiveness of this control, focusing on execution, monitoring, and performance metrics:

{control}
";

pub const DEFAULT_DE: &str = "
You are an AI specialized in control assessments. Evaluate the design effectiveness of this control, focusing on structure, objectives alignment, and risk coverage:

{control}
";

pub const DEFAULT_METHODS: &str = "
Explain your review methodologies:

- 5W analysis
- Operational effectiveness assessment
- Design effectiveness assessment
";

/// 对话 Agent 的默认人设；可由 config/prompts/system.txt 覆盖
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a conversational AI assistant specialized in reviewing internal bank controls.
You have access to a library of internal controls and a set of tools to perform your tasks.

Capabilities:
- Filter controls by ID or attributes
- Review controls via 5W, Operational Effectiveness, Design Effectiveness (max 10 at once)
- Explain your methodologies and introspect your tools
- Update prompt templates for analysis types (5W, OE, DE)
- Compare, segment, and contrast controls

Always respond copiously but concisely, maintain a friendly yet professional tone,
and ask follow-up questions if clarification is needed.
You must use the provided tools for any task that they are designed for.";

pub fn default_template(key: PromptKey) -> &'static str {
    match key {
        PromptKey::FiveW => DEFAULT_5W,
        PromptKey::Oe => DEFAULT_OE,
        PromptKey::De => DEFAULT_DE,
        PromptKey::Methods => DEFAULT_METHODS,
    }
}

/// 读取系统提示词：config/prompts/system.txt（或上级目录）优先，否则用内置默认
pub fn load_system_prompt() -> String {
    ["config/prompts/system.txt", "../config/prompts/system.txt"]
        .into_iter()
        .find_map(|p| std::fs::read_to_string(p).ok())
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string())
}
