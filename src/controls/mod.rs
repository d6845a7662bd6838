//! 控制项库：加载与过滤

pub mod store;

pub use store::{cell_text, Control, ControlStore, StoreError, CONTROL_ID_FIELD};
