//! Agent 运行时
//!
//! create_agent_components 从配置构建 LLM、控制项库、Prompt 注册表与四个工具；
//! ControlReviewAgent 是会话包装：维护只追加的 Transcript，对外只暴露 run(input) -> output。

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::controls::ControlStore;
use crate::core::{AgentError, RecoveryEngine};
use crate::llm::{create_llm_from_config, LlmClient, MOCK_MODEL};
use crate::memory::Transcript;
use crate::prompts::{load_system_prompt, PromptRegistry};
use crate::react::{dispatch_loop, DispatchSession, Planner};
use crate::tools::{
    tool_call_schema_json, BatchReviewControlsTool, ExplainMethodsTool, FilterControlsTool,
    Reviewer, ToolExecutor, ToolRegistry, UpdatePromptTemplateTool,
};

/// 预构建的 Agent 组件
pub struct AgentComponents {
    pub planner: Planner,
    pub executor: ToolExecutor,
    pub recovery: RecoveryEngine,
    pub store: Arc<ControlStore>,
    /// 与工具共享的同一张模板表
    pub prompts: PromptRegistry,
    /// 单条审阅原语，供直接调用（如 sample_run）
    pub reviewer: Reviewer,
    pub max_steps: usize,
    pub max_context_turns: usize,
}

/// 从配置创建组件：LLM 后端、controls_path 指向的控制项文档、系统提示词
pub fn create_agent_components(cfg: &AppConfig) -> AgentComponents {
    let llm = create_llm_from_config(cfg);
    let store = Arc::new(ControlStore::load(&cfg.app.controls_path));
    build_components(cfg, llm, store, &load_system_prompt())
}

/// 用给定 LLM 与控制项库组装组件（测试与离线运行使用）
pub fn build_components(
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
    store: Arc<ControlStore>,
    base_system_prompt: &str,
) -> AgentComponents {
    let prompts = PromptRegistry::with_defaults();
    let reviewer = Reviewer::new(llm.clone(), prompts.clone());

    let mut tools = ToolRegistry::new();
    tools.register(FilterControlsTool::new(store.clone()));
    tools.register(BatchReviewControlsTool::new(reviewer.clone()));
    tools.register(ExplainMethodsTool::new(reviewer.clone()));
    tools.register(UpdatePromptTemplateTool::new(prompts.clone()));
    let executor = ToolExecutor::new(tools, cfg.tools.tool_timeout_secs);

    let system_prompt = build_system_prompt(base_system_prompt, &executor);

    AgentComponents {
        planner: Planner::new(llm, system_prompt),
        executor,
        recovery: RecoveryEngine::new(),
        store,
        prompts,
        reviewer,
        max_steps: cfg.tools.max_react_steps,
        max_context_turns: cfg.app.max_context_turns,
    }
}

/// 系统提示词 = 人设 + 工具目录（名称、描述、参数 schema）+ 工具调用格式
pub fn build_system_prompt(base: &str, executor: &ToolExecutor) -> String {
    let catalogue: String = executor
        .tool_descriptions()
        .into_iter()
        .map(|(name, desc)| format!("- {name}: {desc}\n"))
        .collect();
    format!(
        "{base}\n\n\
         ## Available tools\n{catalogue}\n\
         Tool parameter schemas:\n{schemas}\n\n\
         ## Calling a tool\n\
         To call a tool, reply with exactly one JSON object and nothing else:\n\
         {{\"tool\": \"<ToolName>\", \"args\": <arguments>}}\n\
         The tool call must match this schema:\n{call_schema}\n\
         The tool result is returned to you as an observation. \
         When you can answer the user, reply in plain text without any JSON object.",
        schemas = executor.to_schema_json(),
        call_schema = tool_call_schema_json(),
    )
}

/// 会话包装：一次处理一条输入，成功后把 (输入, 回复) 追加到 Transcript
pub struct ControlReviewAgent {
    components: AgentComponents,
    transcript: Transcript,
    session_id: Uuid,
}

impl ControlReviewAgent {
    pub fn new(components: AgentComponents) -> Self {
        Self {
            components,
            transcript: Transcript::new(),
            session_id: Uuid::new_v4(),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(create_agent_components(cfg))
    }

    /// 处理一条用户输入；失败时 Transcript 不变
    pub async fn run(&mut self, input: &str) -> Result<String, AgentError> {
        let span = tracing::info_span!("session", id = %self.session_id);
        let history = self.transcript.recent(self.components.max_context_turns);
        let session = DispatchSession::new(
            &self.components.planner,
            &self.components.executor,
            &self.components.recovery,
        )
        .with_max_steps(self.components.max_steps);

        let result = dispatch_loop(&session, &history, input)
            .instrument(span.clone())
            .await?;
        span.in_scope(|| {
            tracing::info!(
                steps = result.steps,
                tools = ?result.tool_calls,
                prompt_tokens = result.prompt_tokens,
                completion_tokens = result.completion_tokens,
                "Turn complete"
            )
        });
        self.transcript.push_turn(input, &result.response);
        Ok(result.response)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn prompts(&self) -> &PromptRegistry {
        &self.components.prompts
    }

    pub fn store(&self) -> &ControlStore {
        &self.components.store
    }

    pub fn components(&self) -> &AgentComponents {
        &self.components
    }

    /// 实际生效的后端是否为 Mock（缺少 API Key 时的回退也算）
    pub fn uses_mock_llm(&self) -> bool {
        self.components.planner.sampling().model == MOCK_MODEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockLlmClient, ScriptedLlmClient};
    use crate::memory::Role;

    fn agent(llm: Arc<ScriptedLlmClient>) -> ControlReviewAgent {
        let store = ControlStore::from_json_str(
            r#"[{"control_id": "ACC-001", "category": "Access Control"}]"#,
        )
        .unwrap();
        let cfg = AppConfig::default();
        ControlReviewAgent::new(build_components(&cfg, llm, Arc::new(store), "You review controls."))
    }

    #[test]
    fn test_system_prompt_lists_all_tools() {
        let llm = Arc::new(ScriptedLlmClient::default());
        let agent = agent(llm);
        let prompt = agent.components().planner.system_prompt();
        assert!(prompt.starts_with("You review controls."));
        for tool in [
            "BatchReviewControls",
            "ExplainMethods",
            "FilterControls",
            "UpdatePromptTemplate",
        ] {
            assert!(prompt.contains(&format!("- {tool}: ")), "missing {tool}");
        }
        assert!(prompt.contains("new_template_string"));
    }

    #[tokio::test]
    async fn test_run_appends_turn_and_feeds_history() {
        let llm = Arc::new(ScriptedLlmClient::new(["Hello!", "Second answer"]));
        let mut agent = agent(llm.clone());

        assert_eq!(agent.run("hi").await.unwrap(), "Hello!");
        assert_eq!(agent.run("again").await.unwrap(), "Second answer");

        let entries = agent.transcript().entries();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[3].message.role, Role::Assistant);
        // 第二轮：system + 上一轮两条 + 本轮输入
        let second = &llm.received()[1];
        assert_eq!(second.len(), 4);
        assert_eq!(second[1].content, "hi");
    }

    #[test]
    fn test_uses_mock_llm_reflects_backend() {
        let scripted = agent(Arc::new(ScriptedLlmClient::default()));
        assert!(!scripted.uses_mock_llm());

        let store = Arc::new(ControlStore::from_json_str("[]").unwrap());
        let cfg = AppConfig::default();
        let mock = ControlReviewAgent::new(build_components(&cfg, Arc::new(MockLlmClient), store, "sys"));
        assert!(mock.uses_mock_llm());

        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        let configured = ControlReviewAgent::new(build_components(
            &cfg,
            create_llm_from_config(&cfg),
            Arc::new(ControlStore::from_json_str("[]").unwrap()),
            "sys",
        ));
        assert!(configured.uses_mock_llm());
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_transcript_untouched() {
        let llm = Arc::new(ScriptedLlmClient::default());
        llm.push_error(LlmError::Api("down".into()));
        let mut agent = agent(llm);
        assert!(agent.run("hi").await.is_err());
        assert!(agent.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_update_through_agent_is_shared() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool": "UpdatePromptTemplate", "args": {"prompt_key": "DE", "new_template_string": "DE v2 {control}"}}"#,
            "Updated.",
        ]));
        let mut agent = agent(llm);
        agent.run("change DE").await.unwrap();
        assert_eq!(agent.prompts().get("DE").unwrap().as_str(), "DE v2 {control}");
        assert_eq!(
            agent.components().reviewer.prompts().get("DE").unwrap().as_str(),
            "DE v2 {control}"
        );
    }
}
