//! Prompt 注册表：分析类型 -> 当前模板
//!
//! 单一共享实例（clone 即共享同一张表）；所有渲染路径每次都从这里读取当前模板，
//! 因此 update 成功后立即对所有使用方可见，无需额外同步步骤。

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use crate::prompts::defaults::default_template;
use crate::prompts::{PromptKey, PromptTemplate, TemplateError, UnknownPromptKey};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error(transparent)]
    UnknownKey(#[from] UnknownPromptKey),

    #[error("invalid template for '{key}': {source}")]
    InvalidTemplate {
        key: PromptKey,
        #[source]
        source: TemplateError,
    },
}

/// Prompt 注册表：Arc<RwLock<HashMap>>，可跨组件共享
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    templates: Arc<RwLock<HashMap<PromptKey, PromptTemplate>>>,
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PromptRegistry {
    /// 以四个内置模板初始化
    pub fn with_defaults() -> Self {
        let templates = PromptKey::ALL
            .into_iter()
            .map(|key| (key, builtin(key)))
            .collect();
        Self {
            templates: Arc::new(RwLock::new(templates)),
        }
    }

    /// 按字符串键读取当前模板；未知键返回 None
    pub fn get(&self, key: &str) -> Option<PromptTemplate> {
        let key: PromptKey = key.parse().ok()?;
        Some(self.template(key))
    }

    /// 按类型化键读取当前模板
    pub fn template(&self, key: PromptKey) -> PromptTemplate {
        let guard = self.templates.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(&key).cloned().unwrap_or_else(|| builtin(key))
    }

    /// 校验并原子替换模板；失败时不做任何修改
    pub fn update(&self, key: &str, new_template: &str) -> Result<(), PromptError> {
        let key: PromptKey = key.parse()?;
        let mut guard = self.templates.write().unwrap_or_else(PoisonError::into_inner);
        let template = PromptTemplate::for_key(key, new_template)
            .map_err(|source| PromptError::InvalidTemplate { key, source })?;
        guard.insert(key, template);
        tracing::info!(prompt = %key, "Prompt template updated");
        Ok(())
    }

    /// 已知键（固定顺序）
    pub fn keys(&self) -> Vec<PromptKey> {
        let guard = self.templates.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<PromptKey> = guard.keys().copied().collect();
        keys.sort();
        keys
    }

    /// 所有键与当前模板文本
    pub fn snapshot(&self) -> Vec<(PromptKey, String)> {
        self.keys()
            .into_iter()
            .map(|key| (key, self.template(key).as_str().to_string()))
            .collect()
    }
}

fn builtin(key: PromptKey) -> PromptTemplate {
    let text = default_template(key);
    PromptTemplate::for_key(key, text).unwrap_or_else(|e| {
        tracing::error!(prompt = %key, error = %e, "Built-in template is invalid; using it verbatim");
        PromptTemplate::literal(text)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_present() {
        let reg = PromptRegistry::with_defaults();
        assert_eq!(reg.keys(), PromptKey::ALL.to_vec());
        for key in PromptKey::ALL {
            assert_eq!(reg.template(key).as_str(), default_template(key));
        }
        assert!(reg.get("5W").unwrap().as_str().contains("5W analysis"));
        assert!(reg.get("FOO").is_none());
    }

    #[test]
    fn test_update_visible_through_clones() {
        let reg = PromptRegistry::with_defaults();
        let handle = reg.clone();
        reg.update("5W", "NEW {control}").unwrap();
        assert_eq!(handle.template(PromptKey::FiveW).as_str(), "NEW {control}");
        assert_eq!(handle.get("5W").unwrap().as_str(), "NEW {control}");
    }

    #[test]
    fn test_unknown_key_rejected_without_mutation() {
        let reg = PromptRegistry::with_defaults();
        let before = reg.snapshot();
        let err = reg.update("FOO", "x {control}").unwrap_err();
        assert!(matches!(err, PromptError::UnknownKey(_)));
        assert_eq!(reg.snapshot(), before);
        assert_eq!(reg.keys(), PromptKey::ALL.to_vec());
    }

    #[test]
    fn test_malformed_template_keeps_prior() {
        let reg = PromptRegistry::with_defaults();
        reg.update("OE", "first {control}").unwrap();
        let err = reg.update("OE", "broken {control").unwrap_err();
        assert!(matches!(err, PromptError::InvalidTemplate { key: PromptKey::Oe, .. }));
        assert_eq!(reg.template(PromptKey::Oe).as_str(), "first {control}");
    }

    #[test]
    fn test_concurrent_updates_leave_a_valid_template() {
        let reg = PromptRegistry::with_defaults();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reg = reg.clone();
                std::thread::spawn(move || {
                    reg.update("DE", &format!("variant {i}: {{control}}")).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let current = reg.template(PromptKey::De);
        assert!(current.as_str().starts_with("variant "));
        assert_eq!(current.variables(), vec!["control"]);
    }
}
