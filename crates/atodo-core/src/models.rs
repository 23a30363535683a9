//! Record schemas and the routing decision.
//!
//! Each schema also describes itself as a [`ToolSchema`] so it can be offered
//! to the model, either for extraction or for the routing decision.

use std::fmt;
use std::str::FromStr;

use atodo_ai::ToolSchema;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Long-term memory partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    UserProfile,
    Todo,
    Instructions,
}

impl MemoryType {
    pub const ALL: [MemoryType; 3] = [
        MemoryType::UserProfile,
        MemoryType::Todo,
        MemoryType::Instructions,
    ];

    /// Wire name, used in namespaces and as the routing tool argument.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::UserProfile => "user_profile",
            MemoryType::Todo => "todo",
            MemoryType::Instructions => "instructions",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MemoryType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown memory type '{s}'"))
    }
}

/// The profile of the user being chatted with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub name: Option<String>,
    pub location: Option<String>,
    pub job: Option<String>,
    pub connections: Vec<String>,
    pub interests: Vec<String>,
}

impl UserProfile {
    pub const SCHEMA_NAME: &'static str = "UserProfile";

    pub fn tool_schema() -> ToolSchema {
        ToolSchema::new(
            Self::SCHEMA_NAME,
            "This is the profile of the user you are chatting with",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": ["string", "null"], "description": "The user's name"},
                    "location": {"type": ["string", "null"], "description": "The user's location"},
                    "job": {"type": ["string", "null"], "description": "The user's job"},
                    "connections": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Personal connection of the user, such as family members, friends, or coworkers"
                    },
                    "interests": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Interests that the user has"
                    }
                }
            }),
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "not started")]
    NotStarted,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
    #[serde(rename = "archived")]
    Archived,
}

/// A task on the user's to-do list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToDo {
    pub task: String,
    /// Estimated minutes.
    #[serde(default)]
    pub time_to_complete: Option<u32>,
    #[serde(default, with = "flexible_datetime")]
    pub deadline: Option<NaiveDateTime>,
    #[serde(default)]
    pub solutions: Vec<String>,
    #[serde(default)]
    pub status: TaskStatus,
}

impl ToDo {
    pub const SCHEMA_NAME: &'static str = "ToDo";

    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            time_to_complete: None,
            deadline: None,
            solutions: Vec::new(),
            status: TaskStatus::default(),
        }
    }

    pub fn tool_schema() -> ToolSchema {
        ToolSchema::new(
            Self::SCHEMA_NAME,
            "A task on the user's ToDo list",
            json!({
                "type": "object",
                "properties": {
                    "task": {"type": "string", "description": "The task to be completed."},
                    "time_to_complete": {
                        "type": ["integer", "null"],
                        "description": "Estimated time to complete the task (minutes)."
                    },
                    "deadline": {
                        "type": ["string", "null"],
                        "format": "date-time",
                        "description": "When the task needs to be completed by (if applicable)"
                    },
                    "solutions": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of specific, actionable solutions (e.g., specific ideas, service providers, or concrete options relevant to completing the task)"
                    },
                    "status": {
                        "type": "string",
                        "enum": ["not started", "in progress", "done", "archived"],
                        "description": "Current status of the task"
                    }
                },
                "required": ["task"]
            }),
        )
    }
}

/// Routing decision requested by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMemory {
    pub update_type: MemoryType,
}

impl UpdateMemory {
    pub const TOOL_NAME: &'static str = "UpdateMemory";

    pub fn tool_schema() -> ToolSchema {
        ToolSchema::new(
            Self::TOOL_NAME,
            "Decision on what memory type to update",
            json!({
                "type": "object",
                "properties": {
                    "update_type": {
                        "type": "string",
                        "enum": MemoryType::ALL.map(|kind| kind.as_str()),
                    }
                },
                "required": ["update_type"]
            }),
        )
    }
}

/// Deadlines arrive from the model in several shapes: RFC 3339 with an
/// offset, or a naive timestamp with or without seconds, or a bare date.
/// They are stored as naive local timestamps.
mod flexible_datetime {
    use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer, de};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    pub fn parse(text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        // Offset timestamps become the user's local wall time.
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Some(parsed.with_timezone(&Local).naive_local());
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
    }

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&value.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(text) if text.trim().is_empty() => Ok(None),
            Some(text) => parse(&text)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid deadline '{text}'"))),
        }
    }
}
