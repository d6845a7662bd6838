//! Prompt 层：模板语法、注册表与内置默认值

pub mod defaults;
pub mod registry;
pub mod template;

pub use defaults::{load_system_prompt, DEFAULT_SYSTEM_PROMPT};
pub use registry::{PromptError, PromptRegistry};
pub use template::{PromptKey, PromptTemplate, TemplateError, UnknownPromptKey, CONTROL_VAR};
