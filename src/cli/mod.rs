//! CLI entry point for the notes client.

pub mod auth;
pub mod notes;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::auth::TerminationReason;
use crate::config::ClientConfig;
use crate::http::HttpClient;

/// Notes CLI
#[derive(Parser, Debug)]
#[command(name = "notes", version, about = "Command-line client for the notes backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Session management
    Auth(AuthArgs),
    /// List your notes
    List(ListArgs),
    /// Create a note
    Create(NoteArgs),
    /// Replace the title and content of a note
    Update(UpdateArgs),
    /// Delete a note
    Delete(DeleteArgs),
    /// Account settings
    Account(AccountArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Create an account
    Register(RegisterArgs),
    /// Log in and store the access token
    Login(LoginArgs),
    /// Log out and forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Show whether an access token is stored
    Status,
}

#[derive(Parser, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "NOTES_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Parser, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "NOTES_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only notes whose title matches
    #[arg(long)]
    pub title: Option<String>,
    /// Earliest date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
    /// Latest date (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
    /// Page size
    #[arg(long)]
    pub limit: Option<u32>,
    /// Follow `next` links until every page is fetched
    #[arg(long)]
    pub all: bool,
}

#[derive(Parser, Debug)]
pub struct NoteArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long, default_value = "")]
    pub content: String,
    #[arg(long)]
    pub category: Option<i64>,
}

#[derive(Parser, Debug)]
pub struct UpdateArgs {
    pub id: i64,
    #[command(flatten)]
    pub note: NoteArgs,
}

#[derive(Parser, Debug)]
pub struct DeleteArgs {
    pub id: i64,
}

#[derive(Parser, Debug)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub command: AccountCommands,
}

#[derive(Subcommand, Debug)]
pub enum AccountCommands {
    /// Change your password
    Password(PasswordArgs),
}

#[derive(Parser, Debug)]
pub struct PasswordArgs {
    #[arg(long, env = "NOTES_CURRENT_PASSWORD", hide_env_values = true)]
    pub current: String,
    #[arg(long, env = "NOTES_NEW_PASSWORD", hide_env_values = true)]
    pub new: String,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Client from the environment, with a listener that points the user back at
/// `notes auth login` when the session cannot be recovered.
pub fn connect() -> crate::error::Result<HttpClient> {
    let client = HttpClient::new(ClientConfig::from_env()?)?;
    client.on_session_terminated(|reason: &TerminationReason| {
        eprintln!("Session ended ({reason}). Run `notes auth login` to sign in again.");
    });
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_auth_login() {
        let cli = Cli::try_parse_from([
            "notes", "auth", "login", "--email", "a@b.c", "--password", "pw",
        ])
        .unwrap();
        match cli.command {
            Commands::Auth(auth) => match auth.command {
                AuthCommands::Login(args) => {
                    assert_eq!(args.email, "a@b.c");
                    assert_eq!(args.password, "pw");
                }
                other => panic!("expected Login, got {other:?}"),
            },
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn parse_auth_status_and_logout() {
        for (word, expect_status) in [("status", true), ("logout", false)] {
            let cli = Cli::try_parse_from(["notes", "auth", word]).unwrap();
            match cli.command {
                Commands::Auth(auth) => {
                    assert_eq!(matches!(auth.command, AuthCommands::Status), expect_status);
                }
                other => panic!("expected Auth, got {other:?}"),
            }
        }
    }

    #[test]
    fn parse_list_with_filters() {
        let cli = Cli::try_parse_from([
            "notes",
            "list",
            "--title",
            "todo",
            "--start-date",
            "2024-01-31",
            "--limit",
            "5",
            "--all",
        ])
        .unwrap();
        match cli.command {
            Commands::List(args) => {
                assert_eq!(args.title.as_deref(), Some("todo"));
                assert_eq!(args.start_date, NaiveDate::from_ymd_opt(2024, 1, 31));
                assert!(args.end_date.is_none());
                assert_eq!(args.limit, Some(5));
                assert!(args.all);
            }
            other => panic!("expected List, got {other:?}"),
        }
    }

    #[test]
    fn parse_list_rejects_bad_date() {
        assert!(Cli::try_parse_from(["notes", "list", "--start-date", "yesterday"]).is_err());
    }

    #[test]
    fn parse_update_with_flattened_note() {
        let cli = Cli::try_parse_from([
            "notes", "update", "12", "--title", "New", "--category", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Update(args) => {
                assert_eq!(args.id, 12);
                assert_eq!(args.note.title, "New");
                assert_eq!(args.note.content, "");
                assert_eq!(args.note.category, Some(3));
            }
            other => panic!("expected Update, got {other:?}"),
        }
    }

    #[test]
    fn parse_account_password() {
        let cli = Cli::try_parse_from([
            "notes", "account", "password", "--current", "old", "--new", "fresh",
        ])
        .unwrap();
        match cli.command {
            Commands::Account(account) => match account.command {
                AccountCommands::Password(args) => {
                    assert_eq!(args.current, "old");
                    assert_eq!(args.new, "fresh");
                }
            },
            other => panic!("expected Account, got {other:?}"),
        }
    }

    #[test]
    fn parse_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["notes"]).is_err());
    }

    #[test]
    fn parse_delete_requires_id() {
        assert!(Cli::try_parse_from(["notes", "delete"]).is_err());
    }
}
