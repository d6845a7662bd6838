//! 工具层：控制项过滤、批量审阅、方法说明、提示模板更新，以及注册表与执行器

pub mod executor;
pub mod filter;
pub mod registry;
pub mod review;
pub mod schema;
pub mod update_prompt;

pub use executor::ToolExecutor;
pub use filter::{filter_controls, parse_filter_input, FilterControlsTool, FilterError, FilterQuery};
pub use registry::{input_text, Tool, ToolRegistry};
pub use review::{
    BatchReviewControlsTool, BatchReviewError, BatchReviewRequest, ExplainMethodsTool, ReviewError,
    Reviewer, MAX_BATCH_CONTROLS, NO_ID_SENTINEL,
};
pub use schema::tool_call_schema_json;
pub use update_prompt::{UpdatePromptArgs, UpdatePromptTemplateTool};
