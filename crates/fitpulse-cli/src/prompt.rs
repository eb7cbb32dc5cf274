//! Terminal prompts for credentials.

use std::io::{self, Write};

use anyhow::{bail, Result};

/// Maximum length for email input.
/// 254 is the longest address SMTP will carry.
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Environment variables consulted before prompting
pub const EMAIL_ENV: &str = "FITPULSE_EMAIL";
pub const PASSWORD_ENV: &str = "FITPULSE_PASSWORD";

fn is_valid_input_char(c: char) -> bool {
    // Allow printable ASCII and common extended chars, reject control chars
    !c.is_control()
}

/// Trim and check an email entered by the user
pub fn validate_email(input: &str) -> Result<String> {
    let email = input.trim();
    if email.is_empty() {
        bail!("Please fill in all fields.");
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        bail!("Email must be at most {} characters", MAX_EMAIL_LENGTH);
    }
    if !email.chars().all(is_valid_input_char) {
        bail!("Email contains control characters");
    }
    Ok(email.to_string())
}

/// Check a password entered by the user. Passwords are not trimmed.
pub fn validate_password(input: &str) -> Result<String> {
    if input.is_empty() {
        bail!("Please fill in all fields.");
    }
    if input.chars().count() > MAX_PASSWORD_LENGTH {
        bail!("Password must be at most {} characters", MAX_PASSWORD_LENGTH);
    }
    if !input.chars().all(is_valid_input_char) {
        bail!("Password contains control characters");
    }
    Ok(input.to_string())
}

/// Resolve the email from the flag, the environment, or an interactive prompt
pub fn email(flag: Option<String>, last_email: Option<&str>) -> Result<String> {
    if let Some(email) = flag.or_else(|| std::env::var(EMAIL_ENV).ok()) {
        return validate_email(&email);
    }

    match last_email {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    match (input.trim(), last_email) {
        ("", Some(last)) => Ok(last.to_string()),
        (entered, _) => validate_email(entered),
    }
}

/// Resolve the password from the environment or a hidden prompt.
/// With `confirm`, an interactive password must be typed twice.
pub fn password(confirm: bool) -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return validate_password(&password);
    }

    let password = validate_password(&rpassword::prompt_password("Password: ")?)?;
    if confirm && rpassword::prompt_password("Confirm password: ")? != password {
        bail!("Passwords do not match");
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email("  a@b.com \n").unwrap(), "a@b.com");
        assert!(validate_email("").is_err());
        assert!(validate_email("   ").is_err());
        assert!(validate_email(&"a".repeat(255)).is_err());
        assert!(validate_email("a\u{0}b@c.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert_eq!(validate_password(" pw ").unwrap(), " pw ");
        assert!(validate_password("").is_err());
        assert!(validate_password(&"x".repeat(128)).is_ok());
        assert!(validate_password(&"x".repeat(129)).is_err());
        assert!(validate_password("pw\r").is_err());
    }
}
