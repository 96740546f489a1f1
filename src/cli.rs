use std::path::PathBuf;

use clap::{builder::PossibleValuesParser, Parser, Subcommand};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "huddle", about = "Team chat client with optimistic sending (CLI + TUI)")]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start TUI shell
    Run,
    /// Print the chats of the configured user
    Chats,
    /// Print one page of a chat's history, newest first
    History {
        #[arg(long)]
        chat: Uuid,
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Create a chat and print it
    CreateChat {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "group", value_parser = PossibleValuesParser::new(["private", "group", "team"]))]
        kind: String,
        /// Member user id; repeat for several members
        #[arg(long = "member")]
        members: Vec<Uuid>,
        #[arg(long)]
        team: Option<Uuid>,
    },
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn defaults_to_run_when_command_is_missing() {
        let cli = Cli::parse_from(["huddle"]);

        assert!(matches!(cli.command_or_default(), Command::Run));
    }

    #[test]
    fn parses_explicit_run_command() {
        let cli = Cli::parse_from(["huddle", "run", "--config", "custom.toml"]);

        assert!(matches!(cli.command_or_default(), Command::Run));
        assert_eq!(
            cli.config
                .as_deref()
                .map(|p| p.to_string_lossy().to_string()),
            Some("custom.toml".to_owned())
        );
    }

    #[test]
    fn parses_create_chat_with_repeated_members() {
        let cli = Cli::parse_from([
            "huddle",
            "create-chat",
            "--name",
            "Parents",
            "--member",
            "00000000-0000-0000-0000-0000000000a2",
            "--member",
            "00000000-0000-0000-0000-0000000000a3",
        ]);

        match cli.command_or_default() {
            Command::CreateChat {
                name,
                kind,
                members,
                team,
            } => {
                assert_eq!(name, "Parents");
                assert_eq!(kind, "group");
                assert_eq!(members.len(), 2);
                assert!(team.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_chat_kind() {
        let result = Cli::try_parse_from(["huddle", "create-chat", "--kind", "channel"]);

        assert!(result.is_err());
    }

    #[test]
    fn history_defaults_to_first_page() {
        let cli = Cli::parse_from([
            "huddle",
            "history",
            "--chat",
            "00000000-0000-0000-0000-0000000000c0",
        ]);

        assert!(matches!(
            cli.command_or_default(),
            Command::History { page: 1, .. }
        ));
    }
}
