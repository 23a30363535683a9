use clap::{Parser, Subcommand, ValueEnum};

use atodo_core::MemoryType;

#[derive(Parser)]
#[command(name = "atodo")]
#[command(version, about = "ATodo - a personal assistant that remembers you and your ToDo list")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (defaults to ~/.atodo/atodo.db)
    #[arg(long, global = true, env = "ATODO_DB_PATH")]
    pub db_path: Option<String>,

    /// Keep long-term memory in memory only; takes precedence over --db-path
    #[arg(long, global = true)]
    pub in_memory: bool,

    /// Chat model name
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// User whose memory is read and written
    #[arg(long, global = true)]
    pub user_id: Option<String>,

    /// Assistant category, separating memory per assistant
    #[arg(long, global = true)]
    pub assistant_type: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Chat with the assistant
    Chat {
        /// Conversation id; reuse it to continue the same thread
        #[arg(long, default_value = "1")]
        conversation: String,
    },

    /// Replay a scripted conversation that exercises every kind of memory
    Simulate {
        #[arg(long, default_value = "simulation")]
        conversation: String,
    },

    /// Print stored memory records
    Memory {
        #[arg(value_enum)]
        partition: PartitionArg,
    },

    /// Describe the routing graph
    Graph {
        /// Print Graphviz DOT instead of a table
        #[arg(long)]
        dot: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionArg {
    UserProfile,
    Todo,
    Instructions,
}

impl From<PartitionArg> for MemoryType {
    fn from(value: PartitionArg) -> Self {
        match value {
            PartitionArg::UserProfile => MemoryType::UserProfile,
            PartitionArg::Todo => MemoryType::Todo,
            PartitionArg::Instructions => MemoryType::Instructions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory_partition() {
        let cli = Cli::try_parse_from(["atodo", "memory", "user-profile"]).unwrap();
        match cli.command {
            Commands::Memory { partition } => {
                assert_eq!(MemoryType::from(partition), MemoryType::UserProfile)
            }
            _ => panic!("expected memory command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "atodo",
            "chat",
            "--conversation",
            "7",
            "--user-id",
            "dan",
            "--in-memory",
        ])
        .unwrap();
        assert_eq!(cli.user_id.as_deref(), Some("dan"));
        assert!(cli.in_memory);
        assert!(matches!(cli.command, Commands::Chat { ref conversation } if conversation == "7"));
    }
}
