//! Handlers for each CLI subcommand.

use anyhow::{anyhow, Result};
use fitpulse_core::{AuthError, Config, SessionManager, SessionSnapshot};
use tracing::warn;

use crate::cli::Command;
use crate::prompt;

pub async fn run(command: Command, manager: &SessionManager, config: &mut Config) -> Result<()> {
    match command {
        Command::Status { json } => status(manager, json),
        Command::SignIn { email } => sign_in(manager, config, email).await,
        Command::SignUp { email } => sign_up(manager, config, email).await,
        Command::SignOut => {
            manager.sign_out().await;
            println!("Signed out.");
            Ok(())
        }
    }
}

fn status(manager: &SessionManager, json: bool) -> Result<()> {
    let snapshot = manager.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{}", describe(&snapshot));
    }
    Ok(())
}

/// One-line human description of a session
pub fn describe(snapshot: &SessionSnapshot) -> String {
    match (snapshot.token(), snapshot.authenticated_at()) {
        (Some(token), Some(at)) => format!(
            "Signed in as {} (since {})",
            token,
            at.format("%Y-%m-%d %H:%M UTC")
        ),
        (Some(token), None) => format!("Signed in as {}", token),
        _ => match snapshot.error_message() {
            Some(message) => format!("Not signed in (last attempt failed: {})", message),
            None => "Not signed in".to_string(),
        },
    }
}

async fn sign_in(manager: &SessionManager, config: &mut Config, email: Option<String>) -> Result<()> {
    if let Some(token) = manager.token() {
        println!("Already signed in as {}. Run `fitpulse sign-out` first.", token);
        return Ok(());
    }

    let email = prompt::email(email, config.last_email.as_deref())?;
    let password = prompt::password(false)?;

    match manager.sign_in(&email, &password).await {
        Ok(snapshot) => {
            remember_email(config, email);
            println!("{}", describe(&snapshot));
            Ok(())
        }
        Err(e) => Err(report(manager, e)),
    }
}

async fn sign_up(manager: &SessionManager, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = prompt::email(email, None)?;
    let password = prompt::password(true)?;

    match manager.sign_up(&email, &password).await {
        Ok(()) => {
            remember_email(config, email);
            println!("Account created successfully. Please sign in.");
            Ok(())
        }
        Err(e) => Err(report(manager, e)),
    }
}

fn remember_email(config: &mut Config, email: String) {
    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
}

/// Turn a failed attempt into the error shown to the user, and leave the
/// session ready for another try.
fn report(manager: &SessionManager, error: AuthError) -> anyhow::Error {
    manager.acknowledge_error();
    anyhow!(error.user_message())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(describe(&SessionSnapshot::unauthenticated()), "Not signed in");
        assert_eq!(
            describe(&SessionSnapshot::failed("Login failed")),
            "Not signed in (last attempt failed: Login failed)"
        );
        assert!(describe(&SessionSnapshot::authenticated("a@b.com")).starts_with("Signed in as a@b.com (since "));
    }
}
