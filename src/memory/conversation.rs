//! 会话记录：按时间顺序的 (角色, 文本) 列表
//!
//! Transcript 只追加、不剪枝；送入 LLM 的上下文通过 recent(max_turns) 截取最近若干轮。

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// 对话展示用的发言者名
    pub fn speaker(&self) -> &'static str {
        match self {
            Role::User => "human",
            Role::Assistant => "ai",
            Role::System => "system",
        }
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 会话记录中的一条
#[derive(Clone, Debug)]
pub struct TranscriptEntry {
    pub message: Message,
    pub at: DateTime<Local>,
}

/// 会话记录：会话生命周期内只追加
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.entries.push(TranscriptEntry {
            message,
            at: Local::now(),
        });
    }

    /// 追加一轮 user + assistant
    pub fn push_turn(&mut self, input: &str, output: &str) {
        self.push(Message::user(input));
        self.push(Message::assistant(output));
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// 最近 max_turns 轮（约 max_turns*2 条）消息，作为 LLM 的历史上下文
    pub fn recent(&self, max_turns: usize) -> Vec<Message> {
        let keep = max_turns.saturating_mul(2);
        let start = self.entries.len().saturating_sub(keep);
        self.entries[start..]
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_is_append_only() {
        let mut t = Transcript::new();
        for i in 0..30 {
            t.push_turn(&format!("q{i}"), &format!("a{i}"));
        }
        assert_eq!(t.len(), 60);
        assert_eq!(t.entries()[0].message, Message::user("q0"));
        assert_eq!(t.entries()[0].message.role.speaker(), "human");
    }

    #[test]
    fn test_recent_window() {
        let mut t = Transcript::new();
        for i in 0..5 {
            t.push_turn(&format!("q{i}"), &format!("a{i}"));
        }
        let recent = t.recent(2);
        assert_eq!(recent.len(), 4);
        assert_eq!(recent[0], Message::user("q3"));
        assert_eq!(recent[3], Message::assistant("a4"));
        assert_eq!(t.recent(100).len(), 10);
        assert!(t.recent(0).is_empty());
    }
}
