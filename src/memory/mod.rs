//! 记忆层：会话记录（进程内，只追加）

pub mod conversation;

pub use conversation::{Message, Role, Transcript, TranscriptEntry};
