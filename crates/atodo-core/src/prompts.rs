//! Prompt templates for the controller and the update nodes.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::store::StoredRecord;
use crate::template::render;

pub const CONTROLLER_TEMPLATE: &str = r#"{{role}}

You have a long term memory which keeps track of three things:
1. The user's profile (general information about them)
2. The user's ToDo list
3. General instructions for updating the ToDo list

Here is the current User Profile (may be empty if no information has been collected yet):
<user_profile>
{{user_profile}}
</user_profile>

Here is the current ToDo List (may be empty if no tasks have been added yet):
<todo>
{{todo}}
</todo>

Here are the current user-specified preferences for updating the ToDo list (may be empty if no preferences have been specified yet):
<instructions>
{{instructions}}
</instructions>

Here are your instructions for reasoning about the user's messages:

1. Reason carefully about the user's messages as presented below.

2. Decide whether any of the your long-term memory should be updated:
- If personal information was provided about the user, update the user's profile by calling UpdateMemory tool with type `user_profile`
- If tasks are mentioned, update the ToDo list by calling UpdateMemory tool with type `todo`
- If the user has specified preferences for how to update the ToDo list, update the instructions by calling UpdateMemory tool with type `instructions`
- Call UpdateMemory at most once per response.

3. Tell the user that you have updated your memory, if appropriate:
- Do not tell the user you have updated the user's profile
- Tell the user when you updated the todo list
- Do not tell the user that you have updated instructions

4. Err on the side of updating the todo list. No need to ask for explicit permission.

5. Respond naturally to the user after a tool call was made to save memories, or if no tool call was made."#;

pub const EXTRACTION_TEMPLATE: &str = r#"Reflect on following interaction.

Use the provided tools to retain any necessary memories about the user.

Use parallel tool calling to handle updates and insertions simultaneously.

System Time: {{time}}"#;

pub const INSTRUCTIONS_TEMPLATE: &str = r#"Reflect on the following interaction.

Based on this interaction, update your instructions for how to update ToDo list items. Use any feedback from the user to update how they like to have items added, etc.

Your current instructions are:

<current_instructions>
{{current_instructions}}
</current_instructions>"#;

/// Human turn appended when asking the model to restate its instructions.
pub const INSTRUCTIONS_REQUEST: &str = "Please update the instructions based on the conversation";

/// System prompt for the controller, embedding all three memory partitions.
///
/// Tasks are rendered one JSON object per line.
pub fn controller_prompt(
    role: &str,
    profile: Option<&Value>,
    todos: &[StoredRecord],
    instructions: &str,
) -> String {
    let profile = profile.map(Value::to_string).unwrap_or_default();
    let todo = todos
        .iter()
        .map(|record| record.value.to_string())
        .collect::<Vec<_>>()
        .join("\n");

    let values = HashMap::from([
        ("role", role),
        ("user_profile", profile.as_str()),
        ("todo", todo.as_str()),
        ("instructions", instructions),
    ]);
    render(CONTROLLER_TEMPLATE, &values)
}

pub fn extraction_prompt(now: DateTime<Local>) -> String {
    let time = now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
    render(EXTRACTION_TEMPLATE, &HashMap::from([("time", time.as_str())]))
}

pub fn instructions_prompt(current: Option<&str>) -> String {
    render(
        INSTRUCTIONS_TEMPLATE,
        &HashMap::from([("current_instructions", current.unwrap_or_default())]),
    )
}
