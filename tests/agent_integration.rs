//! Agent 端到端集成测试：脚本化 LLM 驱动完整的工具调用链

use std::sync::Arc;

use control_review::controls::ControlStore;
use control_review::llm::ScriptedLlmClient;
use control_review::memory::Role;
use control_review::{build_components, AppConfig, ControlReviewAgent};
use serde_json::{json, Value};

fn store() -> ControlStore {
    ControlStore::from_json_str(
        r#"[
            {"control_id": "ACC-001", "category": "Access Control", "owner": "IT Security Team"},
            {"control_id": "CHG-005", "category": "Change Management", "owner": "CAB"},
            {"control_id": "BCP-002", "category": "Business Continuity Planning"}
        ]"#,
    )
    .expect("valid controls")
}

fn agent_with(llm: Arc<ScriptedLlmClient>, store: ControlStore) -> ControlReviewAgent {
    let cfg = AppConfig::default();
    ControlReviewAgent::new(build_components(
        &cfg,
        llm,
        Arc::new(store),
        "You are a control review assistant.",
    ))
}

fn call(tool: &str, args: Value) -> String {
    json!({ "tool": tool, "args": args }).to_string()
}

fn last_message(llm: &ScriptedLlmClient, call_index: usize) -> String {
    llm.received()[call_index]
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_filter_then_batch_review_then_answer() {
    let controls = json!([
        {"control_id": "ACC-001", "category": "Access Control", "owner": "IT Security Team"},
        {"control_id": "CHG-005", "category": "Change Management", "owner": "CAB"}
    ]);
    let llm = Arc::new(ScriptedLlmClient::new([
        call("FilterControls", json!({"control_id": ["ACC-001", "CHG-005"]})),
        call(
            "BatchReviewControls",
            json!({"controls": controls, "review_types": ["5W"]}),
        ),
        "5W review of ACC-001".to_string(),
        "5W review of CHG-005".to_string(),
        "Both controls are well scoped.".to_string(),
    ]));
    let mut agent = agent_with(llm.clone(), store());

    let reply = agent.run("Review ACC-001 and CHG-005 using 5W").await.unwrap();
    assert_eq!(reply, "Both controls are well scoped.");
    assert_eq!(llm.call_count(), 5);

    // FilterControls 的 Observation 含两条控制项
    let filter_obs = last_message(&llm, 1);
    assert!(filter_obs.starts_with("Observation from FilterControls: "));
    assert!(filter_obs.contains("ACC-001") && filter_obs.contains("CHG-005"));
    assert!(!filter_obs.contains("BCP-002"));

    // 审阅调用收到的是渲染后的 5W 模板
    let review_prompt = last_message(&llm, 2);
    assert!(review_prompt.contains("5W analysis"));
    assert!(review_prompt.contains("\"control_id\": \"ACC-001\""));

    let batch_obs = last_message(&llm, 4);
    let payload = batch_obs
        .strip_prefix("Observation from BatchReviewControls: ")
        .expect("batch observation");
    let results: Value = serde_json::from_str(payload).unwrap();
    assert_eq!(results["ACC-001"]["5W"], "5W review of ACC-001");
    assert_eq!(results["CHG-005"]["5W"], "5W review of CHG-005");

    let entries = agent.transcript().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].message.role, Role::User);
    assert_eq!(entries[1].message.content, "Both controls are well scoped.");
}

#[tokio::test]
async fn test_prompt_update_propagates_to_later_reviews() {
    let llm = Arc::new(ScriptedLlmClient::new([
        call(
            "UpdatePromptTemplate",
            json!({"prompt_key": "5W", "new_template_string": "NEW {control}"}),
        ),
        "The 5W prompt was updated.".to_string(),
        call("FilterControls", json!("ACC-001")),
        call(
            "BatchReviewControls",
            json!({"controls": [{"control_id": "ACC-001"}], "review_types": ["5W"]}),
        ),
        "review text".to_string(),
        "Done.".to_string(),
    ]));
    let mut agent = agent_with(llm.clone(), store());

    agent.run("Change the 5W prompt").await.unwrap();
    assert!(last_message(&llm, 1).contains("Prompt '5W' updated successfully."));
    assert_eq!(agent.prompts().get("5W").unwrap().as_str(), "NEW {control}");

    agent.run("Now review ACC-001 with 5W").await.unwrap();
    let rendered = &llm.prompts()[4];
    assert!(rendered.starts_with("NEW {"), "rendered: {rendered}");
    assert!(rendered.contains("ACC-001"));
    assert!(!rendered.contains("5W analysis"));
}

#[tokio::test]
async fn test_oversized_batch_is_rejected_without_review_calls() {
    let controls: Vec<Value> = (0..11)
        .map(|i| json!({"control_id": format!("CTRL{}", 1000 + i)}))
        .collect();
    let llm = Arc::new(ScriptedLlmClient::new([
        call(
            "BatchReviewControls",
            json!({"controls": controls, "review_types": ["5W", "OE", "DE"]}),
        ),
        "I can only review 10 controls at a time.".to_string(),
    ]));
    let mut agent = agent_with(llm.clone(), store());

    let reply = agent.run("Review these 11 controls").await.unwrap();
    assert_eq!(reply, "I can only review 10 controls at a time.");
    // 只有两次规划调用，没有任何审阅调用
    assert_eq!(llm.call_count(), 2);
    assert!(last_message(&llm, 1).contains("at most 10 at once"));
}

#[tokio::test]
async fn test_unknown_prompt_key_keeps_registry() {
    let llm = Arc::new(ScriptedLlmClient::new([
        call(
            "UpdatePromptTemplate",
            json!({"prompt_key": "FOO", "new_template_string": "x {control}"}),
        ),
        "That key does not exist.".to_string(),
    ]));
    let mut agent = agent_with(llm.clone(), store());
    let before = agent.prompts().snapshot();

    agent.run("Update FOO").await.unwrap();
    assert!(last_message(&llm, 1).contains("Failed to update prompt 'FOO'"));
    assert_eq!(agent.prompts().snapshot(), before);
}

#[tokio::test]
async fn test_missing_control_document_yields_empty_results() {
    let dir = tempfile::tempdir().unwrap();
    let store = ControlStore::load(dir.path().join("missing.json"));
    assert!(store.is_empty());

    let llm = Arc::new(ScriptedLlmClient::new([
        call("FilterControls", json!({"category": "access"})),
        "No controls matched.".to_string(),
    ]));
    let mut agent = agent_with(llm.clone(), store);

    assert_eq!(agent.run("Show access controls").await.unwrap(), "No controls matched.");
    assert_eq!(last_message(&llm, 1), "Observation from FilterControls: []");
}

#[tokio::test]
async fn test_explain_methods_roundtrip() {
    let llm = Arc::new(ScriptedLlmClient::new([
        call("ExplainMethods", json!("")),
        "I use 5W, OE and DE.".to_string(),
        "Here is how I review controls.".to_string(),
    ]));
    let mut agent = agent_with(llm.clone(), store());

    let reply = agent.run("How do you review?").await.unwrap();
    assert_eq!(reply, "Here is how I review controls.");
    assert!(llm.prompts()[1].contains("Explain your review methodologies"));
    assert_eq!(
        last_message(&llm, 2),
        "Observation from ExplainMethods: I use 5W, OE and DE."
    );
}
