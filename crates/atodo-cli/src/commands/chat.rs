use anyhow::{Context, Result};
use atodo_core::{Assistant, MemoryType};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const HELP: &str = "Commands: /memory <user_profile|todo|instructions>, /quit";

enum Input<'a> {
    Quit,
    Memory(Option<&'a str>),
    Message(&'a str),
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        _ if line.is_empty() => Input::Empty,
        _ if line == "/quit" || line == "/exit" => Input::Quit,
        Some(("/memory", partition)) => Input::Memory(Some(partition.trim())),
        _ if line == "/memory" => Input::Memory(None),
        _ => Input::Message(line),
    }
}

fn parse_partition(name: &str) -> Option<MemoryType> {
    name.replace('-', "_").parse().ok()
}

pub async fn run(assistant: &Assistant, conversation_id: &str) -> Result<()> {
    println!("{}", "ATodo - your assistant with long-term memory".bold());
    println!("{HELP}\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(format!("{} ", "you>".green().bold()).as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Memory(partition) => {
                match partition.and_then(parse_partition) {
                    Some(partition) => print_memory(assistant, partition)?,
                    None => println!("{HELP}"),
                }
            }
            Input::Message(text) => match assistant.submit_turn(conversation_id, text).await {
                Ok(reply) => println!("{} {}\n", "atodo>".cyan().bold(), reply),
                Err(e) => eprintln!("{} {e}", "error:".red().bold()),
            },
        }
    }

    Ok(())
}

/// Values stored in one partition for the assistant's configured user.
pub fn print_memory(assistant: &Assistant, partition: MemoryType) -> Result<()> {
    let config = assistant.config();
    let records = assistant.query_memory(partition, &config.assistant_type, &config.user_id)?;
    let values: Vec<_> = records.into_iter().map(|record| record.value).collect();
    println!("{}", serde_json::to_string_pretty(&values)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert!(matches!(parse_input("  "), Input::Empty));
        assert!(matches!(parse_input("/quit"), Input::Quit));
        assert!(matches!(parse_input("/memory todo"), Input::Memory(Some("todo"))));
        assert!(matches!(parse_input("/memory"), Input::Memory(None)));
        assert!(matches!(parse_input(" Buy milk "), Input::Message("Buy milk")));
    }

    #[test]
    fn test_parse_partition_accepts_dashes() {
        assert_eq!(parse_partition("user-profile"), Some(MemoryType::UserProfile));
        assert_eq!(parse_partition("todo"), Some(MemoryType::Todo));
        assert_eq!(parse_partition("calendar"), None);
    }
}
