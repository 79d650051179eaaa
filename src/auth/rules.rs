//! Password acceptance rules.
//!
//! A password is accepted when it matches its confirmation, fits the
//! configured length bounds, uses at least three of the four character
//! classes (lowercase, uppercase, digits, symbols), and does not appear in
//! the compromised-password corpus.

use crate::config::PasswordConfig;
use crate::errors::Error;
use sha1::{Digest, Sha1};
use tracing::instrument;
use url::Url;

fn character_classes(password: &str) -> usize {
    let mut lower = false;
    let mut upper = false;
    let mut digit = false;
    let mut other = false;
    for ch in password.chars() {
        if ch.is_lowercase() {
            lower = true;
        } else if ch.is_uppercase() {
            upper = true;
        } else if ch.is_ascii_digit() {
            digit = true;
        } else {
            other = true;
        }
    }
    [lower, upper, digit, other].iter().filter(|c| **c).count()
}

/// Apply the local (offline) acceptance rules.
pub fn validate_password(
    password: &str,
    confirmation: &str,
    config: &PasswordConfig,
) -> Result<(), Error> {
    if password != confirmation {
        return Err(Error::Validation {
            field: "password_confirmation",
            message: "Password confirmation does not match".to_string(),
        });
    }
    let length = password.chars().count();
    if length < config.min_length {
        return Err(Error::Validation {
            field: "password",
            message: format!("Password must be at least {} characters", config.min_length),
        });
    }
    if length > config.max_length {
        return Err(Error::Validation {
            field: "password",
            message: format!("Password must be at most {} characters", config.max_length),
        });
    }
    if character_classes(password) < 3 {
        return Err(Error::Validation {
            field: "password",
            message: "Password must use at least three of: lowercase letters, \
                      uppercase letters, digits, and symbols"
                .to_string(),
        });
    }
    Ok(())
}

/// Client for the k-anonymity range endpoint of the Pwned Passwords API.
///
/// Only the first five hex characters of the password's SHA-1 digest leave
/// the process; the response lists candidate suffixes and we match locally.
#[derive(Clone)]
pub struct CompromisedPasswords {
    client: reqwest::Client,
    api_base_url: Url,
}

impl CompromisedPasswords {
    pub fn new(api_base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base_url,
        }
    }

    #[instrument(skip_all)]
    pub async fn is_compromised(&self, password: &str) -> anyhow::Result<bool> {
        let digest = Sha1::digest(password.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02X}")).collect();
        let (prefix, suffix) = hex.split_at(5);

        let url = self.api_base_url.join(&format!("range/{prefix}"))?;
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(body.lines().any(|line| {
            line.split(':')
                .next()
                .is_some_and(|candidate| candidate.trim().eq_ignore_ascii_case(suffix))
        }))
    }
}
