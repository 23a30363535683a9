use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_ID: &str = "default-user";
pub const DEFAULT_ASSISTANT_TYPE: &str = "general";
pub const DEFAULT_ROLE: &str = "You are a helpful task management assistant. You help to create, organize, and track the user's ToDo list.";

/// Default node visits per turn before the executor gives up.
pub const DEFAULT_MAX_STEPS: usize = 25;

const USER_ID_ENV: &str = "USER_ID";
const ASSISTANT_TYPE_ENV: &str = "ASSISTANT_TYPE";
const ROLE_ENV: &str = "ATODO_ASSISTANT_ROLE";

/// Per-conversation identity and persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub user_id: String,
    pub assistant_type: String,
    pub role: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID.to_string(),
            assistant_type: DEFAULT_ASSISTANT_TYPE.to_string(),
            role: DEFAULT_ROLE.to_string(),
        }
    }
}

impl AssistantConfig {
    pub fn new(user_id: impl Into<String>, assistant_type: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            assistant_type: assistant_type.into(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Apply overrides from `lookup`; non-empty values win over the current ones.
    pub fn resolve_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(user_id) = non_empty(USER_ID_ENV) {
            self.user_id = user_id;
        }
        if let Some(assistant_type) = non_empty(ASSISTANT_TYPE_ENV) {
            self.assistant_type = assistant_type;
        }
        if let Some(role) = non_empty(ROLE_ENV) {
            self.role = role;
        }
        self
    }

    /// Apply `USER_ID`, `ASSISTANT_TYPE` and `ATODO_ASSISTANT_ROLE` from the environment.
    pub fn with_env_overrides(self) -> Self {
        self.resolve_with(|key| std::env::var(key).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    pub max_steps: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}
