//! Control Review - 对话式内部控制审阅智能体
//!
//! 模块划分：
//! - **agent**: 组件构建与会话包装（run(input) -> output）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **controls**: 控制项库（加载、按 ID / 属性过滤）
//! - **core**: 错误类型与恢复
//! - **llm**: LLM 客户端抽象与实现（Anthropic / OpenAI 兼容 / Mock）
//! - **memory**: 会话记录
//! - **observability**: 日志初始化
//! - **prompts**: 分析模板、模板注册表与系统提示词
//! - **react**: Planner 与对话分派循环
//! - **tools**: FilterControls、BatchReviewControls、ExplainMethods、UpdatePromptTemplate 与执行器

pub mod agent;
pub mod config;
pub mod controls;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod prompts;
pub mod react;
pub mod tools;

pub use agent::{build_components, create_agent_components, AgentComponents, ControlReviewAgent};
pub use config::{load_config, AppConfig};
