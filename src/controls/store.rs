//! 控制项库：从 JSON 文档加载，按 ID 或属性子串过滤
//!
//! 加载失败（文件缺失、非法 JSON、形状不对）时不报错，而是得到一个空库并输出 warn 日志；
//! 调用方始终持有一个（可能为空的）ControlStore。

use std::collections::HashSet;
use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;

/// 标识字段名
pub const CONTROL_ID_FIELD: &str = "control_id";

/// 单条控制项：属性名 -> 值，schema 不固定
pub type Control = Map<String, Value>;

/// 加载控制项文档时的错误（在 load 边界处转为 warn + 空库）
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("control document not found: {0}")]
    NotFound(String),

    #[error("failed to read control document: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not decode control document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("control document must be a JSON array of objects (found {0})")]
    WrongShape(String),
}

/// 控制项库：有序记录 + 派生的列索引（所有记录出现过的属性名，按首次出现顺序）
#[derive(Debug, Clone, Default)]
pub struct ControlStore {
    controls: Vec<Control>,
    columns: Vec<String>,
}

impl ControlStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(controls: Vec<Control>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for control in &controls {
            for key in control.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
        }
        Self { controls, columns }
    }

    /// 解析 JSON 文本；要求顶层为数组且每个元素都是对象
    pub fn from_json_str(text: &str) -> Result<Self, StoreError> {
        let value: Value = serde_json::from_str(text)?;
        let items = match value {
            Value::Array(items) => items,
            other => return Err(StoreError::WrongShape(json_kind(&other).to_string())),
        };
        let mut controls = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Object(map) => controls.push(map),
                other => {
                    return Err(StoreError::WrongShape(format!(
                        "array containing {}",
                        json_kind(&other)
                    )))
                }
            }
        }
        Ok(Self::from_records(controls))
    }

    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// 加载控制项文档；任何失败都降级为空库并输出诊断日志
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(store) if store.is_empty() => {
                tracing::warn!(
                    path = %path.display(),
                    "Control document is empty; control store is empty"
                );
                store
            }
            Ok(store) => {
                tracing::info!(
                    path = %path.display(),
                    controls = store.len(),
                    columns = store.columns.len(),
                    "Control store loaded"
                );
                store
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Control store is empty");
                Self::empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// 列索引：所有出现过的属性名
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// 按 control_id 集合过滤（按字符串比较），保持库内顺序
    ///
    /// 空集合、未知 ID 均返回空；库中没有 control_id 列时返回空并输出 warn。
    pub fn filter_by_ids<I, S>(&self, ids: I) -> Vec<Control>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.is_empty() {
            tracing::warn!("Filtering attempted on an empty control store");
            return Vec::new();
        }
        if !self.has_column(CONTROL_ID_FIELD) {
            tracing::warn!(
                "'{}' column not found in control store; cannot filter by id",
                CONTROL_ID_FIELD
            );
            return Vec::new();
        }
        let wanted: HashSet<String> = ids.into_iter().map(|s| s.as_ref().to_string()).collect();
        if wanted.is_empty() {
            return Vec::new();
        }
        self.controls
            .iter()
            .filter(|c| {
                c.get(CONTROL_ID_FIELD)
                    .and_then(cell_text)
                    .is_some_and(|id| wanted.contains(&id))
            })
            .cloned()
            .collect()
    }

    /// 按属性子串过滤（不区分大小写，所有条件需同时满足）
    ///
    /// 不在列索引中的属性被跳过（逐个 warn），不视为不匹配；缺失或 null 的值永不匹配。
    pub fn filter_by_attributes(&self, filters: &[(String, String)]) -> Vec<Control> {
        if self.is_empty() {
            tracing::warn!("Filtering attempted on an empty control store");
            return Vec::new();
        }
        let mut active: Vec<(&str, String)> = Vec::with_capacity(filters.len());
        for (attr, needle) in filters {
            if self.has_column(attr) {
                active.push((attr.as_str(), needle.to_lowercase()));
            } else {
                tracing::warn!(
                    attribute = %attr,
                    "Filter attribute not found in controls; skipping this filter"
                );
            }
        }
        self.controls
            .iter()
            .filter(|c| {
                active.iter().all(|(attr, needle)| {
                    c.get(*attr)
                        .and_then(cell_text)
                        .is_some_and(|v| v.to_lowercase().contains(needle.as_str()))
                })
            })
            .cloned()
            .collect()
    }
}

/// 单元格转文本；null 视为未设置
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
