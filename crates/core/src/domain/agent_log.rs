// Agent Log Domain Model - observation of a single agent turn

use serde::{Deserialize, Serialize};

/// Role of the logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRole {
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for LogRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogRole::User => write!(f, "user"),
            LogRole::Assistant => write!(f, "assistant"),
            LogRole::Tool => write!(f, "tool"),
        }
    }
}

/// One persisted agent conversation turn. Written best-effort by the agent
/// runner: log failures never abort a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLog {
    pub id: String,
    pub job_id: crate::domain::JobId,
    pub agent_name: String,
    pub role: LogRole,
    pub content: String,
    pub tool_calls: Option<serde_json::Value>,
    pub timestamp: i64, // epoch ms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(LogRole::User.to_string(), "user");
        assert_eq!(LogRole::Assistant.to_string(), "assistant");
        assert_eq!(LogRole::Tool.to_string(), "tool");
    }
}
