//! 审阅工具：单条审阅原语、BatchReviewControls、ExplainMethods
//!
//! Reviewer 每次渲染都从 PromptRegistry 读取当前模板，因此模板更新后无需任何重新同步。
//! 批量审阅在任何 LLM 调用之前完成全部校验（含 10 条上限）；单条控制项或单个审阅类型的失败只影响自己的结果槽位。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::controls::{cell_text, Control, CONTROL_ID_FIELD};
use crate::llm::{LlmClient, LlmError};
use crate::prompts::{PromptKey, PromptRegistry, TemplateError, CONTROL_VAR};
use crate::tools::{input_text, Tool};

/// 单次批量审阅的控制项上限
pub const MAX_BATCH_CONTROLS: usize = 10;

/// 控制项缺少 control_id 时使用的结果键
pub const NO_ID_SENTINEL: &str = "<no-id>";

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Unknown review type: {0} (expected one of 5W, OE, DE)")]
    UnknownReviewType(String),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("could not serialise control: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// 批量审阅输入校验错误（按校验顺序排列）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchReviewError {
    #[error("Invalid JSON input to BatchReviewControls: {0}")]
    InvalidJson(String),

    #[error("Invalid input format. Expected a JSON object with 'controls' and 'review_types'.")]
    NotAnObject,

    #[error("Invalid input format. 'controls' and 'review_types' must be lists.")]
    NotLists,

    #[error("'controls' list cannot be empty.")]
    EmptyControls,

    #[error("'review_types' list cannot be empty.")]
    EmptyReviewTypes,

    #[error("Can review at most {max} at once; got {got} controls.")]
    TooManyControls { max: usize, got: usize },

    #[error("'review_types' must contain only strings.")]
    NonStringReviewType,
}

/// 已校验的批量审阅请求
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReviewRequest {
    pub controls: Vec<Value>,
    pub review_types: Vec<String>,
}

impl BatchReviewRequest {
    pub fn parse(input: &str) -> Result<Self, BatchReviewError> {
        let value: Value = serde_json::from_str(input)
            .map_err(|_| BatchReviewError::InvalidJson(input.to_string()))?;
        let Value::Object(mut obj) = value else {
            return Err(BatchReviewError::NotAnObject);
        };
        let (Some(Value::Array(controls)), Some(Value::Array(review_types))) =
            (obj.remove("controls"), obj.remove("review_types"))
        else {
            return Err(BatchReviewError::NotLists);
        };
        if controls.is_empty() {
            return Err(BatchReviewError::EmptyControls);
        }
        if review_types.is_empty() {
            return Err(BatchReviewError::EmptyReviewTypes);
        }
        if controls.len() > MAX_BATCH_CONTROLS {
            return Err(BatchReviewError::TooManyControls {
                max: MAX_BATCH_CONTROLS,
                got: controls.len(),
            });
        }
        let review_types = review_types
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                _ => Err(BatchReviewError::NonStringReviewType),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            controls,
            review_types,
        })
    }
}

/// 审阅器：LLM + 共享的 PromptRegistry
#[derive(Clone)]
pub struct Reviewer {
    llm: Arc<dyn LlmClient>,
    prompts: PromptRegistry,
}

impl Reviewer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: PromptRegistry) -> Self {
        Self { llm, prompts }
    }

    pub fn prompts(&self) -> &PromptRegistry {
        &self.prompts
    }

    /// 单条审阅：用当前模板渲染控制项并交给 LLM
    pub async fn review(&self, control: &Control, review_type: &str) -> Result<String, ReviewError> {
        let key = review_type
            .parse::<PromptKey>()
            .ok()
            .filter(PromptKey::is_review)
            .ok_or_else(|| ReviewError::UnknownReviewType(review_type.to_string()))?;
        let serialized = serde_json::to_string_pretty(control)?;
        let prompt = self
            .prompts
            .template(key)
            .render(&[(CONTROL_VAR, serialized.as_str())])?;
        tracing::debug!(review = %key, prompt_chars = prompt.len(), "Rendering review");
        Ok(self.llm.generate(&prompt).await?)
    }

    /// 渲染 METHODS 模板（无变量）并原样返回 LLM 输出
    pub async fn explain_methods(&self) -> Result<String, ReviewError> {
        let prompt = self.prompts.template(PromptKey::Methods).render(&[])?;
        Ok(self.llm.generate(&prompt).await?)
    }

    /// 执行已校验的批量请求：control_id -> { 审阅类型 -> 文本 }
    pub async fn review_batch(&self, request: &BatchReviewRequest) -> Map<String, Value> {
        let mut results = Map::new();
        for item in &request.controls {
            let Value::Object(control) = item else {
                results.insert(
                    item_label(item),
                    json!({ "error": "Each item in 'controls' must be a dictionary." }),
                );
                continue;
            };
            let control_id = control
                .get(CONTROL_ID_FIELD)
                .and_then(cell_text)
                .unwrap_or_else(|| NO_ID_SENTINEL.to_string());
            let mut per_type = Map::new();
            for review_type in &request.review_types {
                let text = match self.review(control, review_type).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(control = %control_id, review = %review_type, error = %e, "Review failed");
                        format!("Error: {e}")
                    }
                };
                per_type.insert(review_type.clone(), Value::String(text));
            }
            results.insert(control_id, Value::Object(per_type));
        }
        results
    }
}

/// 非对象条目的结果键：字符串原样，其它值用 JSON 文本
fn item_label(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// BatchReviewControls 工具
pub struct BatchReviewControlsTool {
    reviewer: Reviewer,
}

impl BatchReviewControlsTool {
    pub const NAME: &'static str = "BatchReviewControls";

    pub fn new(reviewer: Reviewer) -> Self {
        Self { reviewer }
    }

    /// 以文本输入执行批量审阅，返回结果 JSON（错误时为 `{"error": ...}`）
    pub async fn run(&self, input: &str) -> Value {
        match BatchReviewRequest::parse(input) {
            Ok(request) => {
                tracing::info!(
                    controls = request.controls.len(),
                    review_types = ?request.review_types,
                    "BatchReviewControls"
                );
                Value::Object(self.reviewer.review_batch(&request).await)
            }
            Err(e) => json!({ "error": e.to_string() }),
        }
    }
}

#[async_trait]
impl Tool for BatchReviewControlsTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Run 5W, OE, DE reviews on up to 10 controls. \
         Args: Expects a single JSON string or object with two keys: 'controls' (list of control objects) \
         and 'review_types' (list of strings, e.g. ['5W','OE','DE'])."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "controls": {
                    "type": "array",
                    "items": { "type": "object" },
                    "maxItems": MAX_BATCH_CONTROLS,
                    "description": "Control objects to review (at most 10)"
                },
                "review_types": {
                    "type": "array",
                    "items": { "type": "string", "enum": ["5W", "OE", "DE"] }
                }
            },
            "required": ["controls", "review_types"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        Ok(self.run(&input_text(&args)).await.to_string())
    }
}

/// ExplainMethods 工具：输入被忽略
pub struct ExplainMethodsTool {
    reviewer: Reviewer,
}

impl ExplainMethodsTool {
    pub const NAME: &'static str = "ExplainMethods";

    pub fn new(reviewer: Reviewer) -> Self {
        Self { reviewer }
    }
}

#[async_trait]
impl Tool for ExplainMethodsTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Explain how 5W, OE, and DE analyses are performed."
    }

    async fn execute(&self, _args: Value) -> Result<String, String> {
        Ok(match self.reviewer.explain_methods().await {
            Ok(text) => text,
            Err(e) => format!("Error: {e}"),
        })
    }
}
