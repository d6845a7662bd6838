//! 认知层：Planner 与对话分派循环

pub mod loop_;
pub mod planner;

pub use loop_::{dispatch_loop, DispatchSession, ReactResult, MAX_REACT_STEPS};
pub use planner::{parse_llm_output, Planner, PlannerOutput, ToolCall};
