use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "fitpulse", version, about = "Sign in to fitpulse and inspect the current session")]
pub struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Override the auth service URL for this run
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Show whether a session is active
    Status {
        /// Print the session snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign in and remember the session
    SignIn {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create a new account
    SignUp {
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the current session
    SignOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sign_in_with_email() {
        let cli = Cli::try_parse_from(["fitpulse", "sign-in", "--email", "a@b.com"]).unwrap();
        assert_eq!(
            cli.command,
            Command::SignIn {
                email: Some("a@b.com".to_string())
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fitpulse",
            "status",
            "--json",
            "--api-url",
            "http://10.0.0.2:8080",
        ])
        .unwrap();
        assert_eq!(cli.command, Command::Status { json: true });
        assert_eq!(cli.api_url.as_deref(), Some("http://10.0.0.2:8080"));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["fitpulse"]).is_err());
    }
}
