use anyhow::Result;
use atodo_core::{Assistant, MemoryType};
use chrono::{DateTime, Duration, Local};
use colored::Colorize;

use crate::commands::chat::print_memory;

const INTRODUCTION: &str = "I am Dan. I live in Beaverton, Oregon, and like to ride my bicycle.";

const INSTRUCTIONS: &str = "\
Consider following instructions:
- When providing a 'todo summary':
  1. List all current tasks grouped by deadline (overdue, today, this week, future)
  2. Highlight any tasks missing deadlines and gently encourage adding them
  3. Note any tasks that seem important but lack time estimates
- Proactively ask for deadlines when new tasks are added without them
- Maintain a supportive tone while helping the user stay accountable
- Help prioritize tasks based on deadlines and importance

Your communication style should be encouraging and helpful, never judgmental.

When tasks are missing deadlines, respond with something like \"I notice [task] doesn't have \
a deadline yet. Would you like to add one to help us track it better?\"";

fn minutes(at: DateTime<Local>) -> String {
    at.format("%Y-%m-%dT%H:%M").to_string()
}

/// The scripted conversation: an introduction, standing instructions, three
/// tasks (one without a deadline) and a follow-up supplying that deadline.
pub fn script(now: DateTime<Local>) -> Vec<String> {
    vec![
        INTRODUCTION.to_string(),
        INSTRUCTIONS.to_string(),
        format!(
            "Current time is: {}.\n\
             Create or update few ToDos:\n\
             1) Buy rye bread from the nearby Whole Foods store by {}.\n\
             2) Upload AToDo agentic app to the Github by {}.\n\
             3) Register for Friends Of Trees event in my neighbourhood.",
            minutes(now),
            minutes(now + Duration::hours(3)),
            minutes(now + Duration::days(10)),
        ),
        format!("by {}", minutes(now + Duration::days(30))),
    ]
}

pub async fn run(assistant: &Assistant, conversation_id: &str) -> Result<()> {
    for message in script(Local::now()) {
        println!("{} {}", "you>".green().bold(), message.trim());
        let reply = assistant.submit_turn(conversation_id, &message).await?;
        println!("{} {}\n", "atodo>".cyan().bold(), reply);
    }

    for partition in MemoryType::ALL {
        println!("{}", format!("[{partition}]").bold());
        print_memory(assistant, partition)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_script_deadlines_are_relative_to_now() {
        let now = Local.with_ymd_and_hms(2026, 6, 1, 9, 30, 0).unwrap();
        let script = script(now);

        assert_eq!(script.len(), 4);
        assert!(script[0].starts_with("I am Dan"));
        assert!(script[2].contains("Current time is: 2026-06-01T09:30."));
        assert!(script[2].contains("Whole Foods store by 2026-06-01T12:30."));
        assert!(script[2].contains("Github by 2026-06-11T09:30."));
        assert_eq!(script[3], "by 2026-07-01T09:30");
    }
}
