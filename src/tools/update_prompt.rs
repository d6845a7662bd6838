//! UpdatePromptTemplate 工具：运行时替换某个提示模板

use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use serde_json::Value;

use crate::prompts::PromptRegistry;
use crate::tools::Tool;

/// 工具参数
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdatePromptArgs {
    /// 提示键：5W、OE、DE 或 METHODS
    pub prompt_key: String,
    /// 新模板文本；分析模板需包含 {control} 占位符
    pub new_template_string: String,
}

impl UpdatePromptArgs {
    /// 接受对象，或内容为 JSON 对象的字符串
    pub fn from_value(args: Value) -> Result<Self, String> {
        let args = match args {
            Value::String(s) => serde_json::from_str(&s)
                .map_err(|_| format!("Invalid JSON input to UpdatePromptTemplate: {s}"))?,
            other => other,
        };
        serde_json::from_value(args).map_err(|e| {
            format!("Invalid input format. Expected 'prompt_key' and 'new_template_string': {e}")
        })
    }
}

pub struct UpdatePromptTemplateTool {
    prompts: PromptRegistry,
}

impl UpdatePromptTemplateTool {
    pub const NAME: &'static str = "UpdatePromptTemplate";

    pub fn new(prompts: PromptRegistry) -> Self {
        Self { prompts }
    }

    /// 执行更新，返回给用户的状态文本
    pub fn apply(&self, args: &UpdatePromptArgs) -> String {
        match self.prompts.update(&args.prompt_key, &args.new_template_string) {
            Ok(()) => format!("Prompt '{}' updated successfully.", args.prompt_key.trim()),
            Err(e) => {
                tracing::warn!(key = %args.prompt_key, error = %e, "Prompt update rejected");
                format!("Failed to update prompt '{}': {e}", args.prompt_key)
            }
        }
    }
}

#[async_trait]
impl Tool for UpdatePromptTemplateTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Update a review prompt template at runtime. \
         Args: 'prompt_key' (one of 5W, OE, DE, METHODS) and 'new_template_string' \
         (analysis templates must contain the {control} placeholder)."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schema_for!(UpdatePromptArgs)).unwrap_or(Value::Null)
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        Ok(match UpdatePromptArgs::from_value(args) {
            Ok(args) => self.apply(&args),
            Err(msg) => msg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::PromptKey;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_success_is_visible_to_registry_clones() {
        let prompts = PromptRegistry::with_defaults();
        let tool = UpdatePromptTemplateTool::new(prompts.clone());
        let out = tool
            .execute(json!({"prompt_key": "5W", "new_template_string": "Short 5W: {control}"}))
            .await
            .unwrap();
        assert_eq!(out, "Prompt '5W' updated successfully.");
        assert_eq!(prompts.template(PromptKey::FiveW).as_str(), "Short 5W: {control}");
    }

    #[tokio::test]
    async fn test_unknown_key_leaves_registry_unchanged() {
        let prompts = PromptRegistry::with_defaults();
        let before = prompts.snapshot();
        let tool = UpdatePromptTemplateTool::new(prompts.clone());
        let out = tool
            .execute(json!({"prompt_key": "FOO", "new_template_string": "x"}))
            .await
            .unwrap();
        assert!(out.starts_with("Failed to update prompt 'FOO'"));
        assert_eq!(prompts.snapshot(), before);
        assert_eq!(prompts.keys(), PromptKey::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_invalid_template_rejected() {
        let prompts = PromptRegistry::with_defaults();
        let tool = UpdatePromptTemplateTool::new(prompts.clone());
        let out = tool
            .execute(json!({"prompt_key": "OE", "new_template_string": "no placeholder here"}))
            .await
            .unwrap();
        assert!(out.starts_with("Failed to update prompt 'OE'"));
        assert!(prompts
            .template(PromptKey::Oe)
            .as_str()
            .contains("operational effectiveness"));
    }

    #[tokio::test]
    async fn test_string_encoded_args() {
        let prompts = PromptRegistry::with_defaults();
        let tool = UpdatePromptTemplateTool::new(prompts.clone());
        let encoded = json!({"prompt_key": "METHODS", "new_template_string": "Describe methods."}).to_string();
        let out = tool.execute(Value::String(encoded)).await.unwrap();
        assert_eq!(out, "Prompt 'METHODS' updated successfully.");

        let out = tool.execute(json!("not json")).await.unwrap();
        assert!(out.contains("Invalid JSON input"));
        let out = tool.execute(json!({"prompt_key": "5W"})).await.unwrap();
        assert!(out.contains("new_template_string"));
    }
}
