//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CTRL_REVIEW__*` 覆盖（双下划线表示嵌套，如 `CTRL_REVIEW__LLM__PROVIDER=openai`）。
//! ANTHROPIC_* 采样变量在创建 Anthropic 客户端时另行叠加（见 llm::anthropic）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::llm::{SamplingConfig, DEFAULT_ANTHROPIC_MODEL};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub tools: ToolsSection,
}

/// [app] 段：应用名、控制项文档路径、对话轮数上限
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    #[serde(default = "default_controls_path")]
    pub controls_path: PathBuf,
    /// 送入 LLM 的历史轮数
    #[serde(default = "default_max_context_turns")]
    pub max_context_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            controls_path: default_controls_path(),
            max_context_turns: default_max_context_turns(),
        }
    }
}

fn default_controls_path() -> PathBuf {
    PathBuf::from("controls.json")
}

fn default_max_context_turns() -> usize {
    20
}

/// [llm] 段：后端选择、采样参数与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：anthropic / openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

impl LlmSection {
    pub fn sampling(&self) -> SamplingConfig {
        SamplingConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    4096
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    120
}

/// [tools] 段：工具超时与单轮最大工具步数
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）；一次批量审阅最多 30 次 LLM 调用，默认给足
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default = "default_max_react_steps")]
    pub max_react_steps: usize,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
            max_react_steps: default_max_react_steps(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    600
}

fn default_max_react_steps() -> usize {
    15
}

/// 从 config 目录加载配置，环境变量 CTRL_REVIEW__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CTRL_REVIEW__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CTRL_REVIEW")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.controls_path, PathBuf::from("controls.json"));
        assert_eq!(cfg.app.max_context_turns, 20);
        assert_eq!(cfg.llm.provider, "anthropic");
        assert_eq!(cfg.llm.sampling().model, DEFAULT_ANTHROPIC_MODEL);
        assert_eq!(cfg.llm.sampling().max_tokens, 4096);
        assert_eq!(cfg.tools.max_react_steps, 15);
    }

    #[test]
    fn test_explicit_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[app]\ncontrols_path = \"data/prc.json\"\n\n[llm]\nprovider = \"mock\"\ntemperature = 0.7"
        )
        .unwrap();
        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.app.controls_path, PathBuf::from("data/prc.json"));
        assert_eq!(cfg.llm.provider, "mock");
        assert!((cfg.llm.temperature - 0.7).abs() < f32::EPSILON);
        // 未出现的键保持默认
        assert_eq!(cfg.llm.max_tokens, 4096);
    }
}
