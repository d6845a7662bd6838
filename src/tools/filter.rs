//! FilterControls 工具：按 ID 或属性过滤控制项
//!
//! 输入是 LLM 产出的文本，先解析为 FilterQuery 再交给 ControlStore：
//! - 非 JSON 文本 -> 单个字面 ID
//! - JSON 字符串 -> 单个 ID
//! - 含 control_id 的对象 -> ID（字符串或字符串数组）
//! - 不含 control_id 的对象 -> 属性子串过滤
//! - 字符串数组 -> ID 列表
//! - 其它形状 -> 错误结果

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::controls::{Control, ControlStore, CONTROL_ID_FIELD};
use crate::tools::{input_text, Tool};

/// 解析后的过滤请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterQuery {
    Ids(Vec<String>),
    Attributes(Vec<(String, String)>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid item type in control_id list. All IDs must be strings.")]
    InvalidIdItem,

    #[error("Invalid format for 'control_id' value in JSON input. Must be a string or list of strings.")]
    InvalidIdValue,

    #[error("Invalid filter value for attribute '{0}'. Must be a string, number or boolean.")]
    InvalidFilterValue(String),

    #[error("Parsed JSON input is not a dictionary of filters, a dictionary with 'control_id', or a list of ID strings: {0}")]
    UnsupportedShape(String),
}

/// 解析 FilterControls 输入文本
pub fn parse_filter_input(input: &str) -> Result<FilterQuery, FilterError> {
    let value: Value = match serde_json::from_str(input) {
        Ok(v) => v,
        Err(_) => return Ok(FilterQuery::Ids(vec![input.trim().to_string()])),
    };

    match value {
        Value::String(id) => Ok(FilterQuery::Ids(vec![id])),
        Value::Object(map) => match map.get(CONTROL_ID_FIELD) {
            Some(Value::String(id)) => Ok(FilterQuery::Ids(vec![id.clone()])),
            Some(Value::Array(items)) => string_items(items)
                .map(FilterQuery::Ids)
                .ok_or(FilterError::InvalidIdItem),
            Some(_) => Err(FilterError::InvalidIdValue),
            None => {
                let mut filters = Vec::with_capacity(map.len());
                for (attr, val) in map {
                    let needle = match val {
                        Value::String(s) => s,
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        _ => return Err(FilterError::InvalidFilterValue(attr)),
                    };
                    filters.push((attr, needle));
                }
                Ok(FilterQuery::Attributes(filters))
            }
        },
        Value::Array(items) => string_items(&items)
            .map(FilterQuery::Ids)
            .ok_or_else(|| FilterError::UnsupportedShape(input.to_string())),
        _ => Err(FilterError::UnsupportedShape(input.to_string())),
    }
}

fn string_items(items: &[Value]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// 解析并执行过滤；ID 优先于属性（二者互斥）
pub fn filter_controls(store: &ControlStore, input: &str) -> Result<Vec<Control>, FilterError> {
    let query = parse_filter_input(input)?;
    let found = match &query {
        FilterQuery::Ids(ids) => store.filter_by_ids(ids),
        FilterQuery::Attributes(filters) => store.filter_by_attributes(filters),
    };
    tracing::debug!(?query, matches = found.len(), "FilterControls");
    Ok(found)
}

/// FilterControls 工具
pub struct FilterControlsTool {
    store: Arc<ControlStore>,
}

impl FilterControlsTool {
    pub const NAME: &'static str = "FilterControls";

    pub fn new(store: Arc<ControlStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for FilterControlsTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Filter controls by any attribute (e.g. {\"category\": \"Access Control\"}) or by control_id \
         (e.g. \"ACC-001\" or {\"control_id\": \"ACC-001\"} or {\"control_id\": [\"ACC-001\", \"ACC-002\"]}). \
         Returns a list of matching control objects."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": "A control_id, a JSON list of control_ids, or a JSON object of attribute filters"
                }
            },
            "required": ["input"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let input = input_text(&args);
        let payload = match filter_controls(&self.store, &input) {
            Ok(controls) => Value::Array(controls.into_iter().map(Value::Object).collect()),
            Err(e) => json!({ "error": e.to_string() }),
        };
        Ok(payload.to_string())
    }
}
