//! Sign-up and login form rules.

use serde::Deserialize;

use super::forms::{FieldErrors, required};

pub const MAX_USERNAME_CHARS: usize = 150;
pub const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupDraft {
    pub username: String,
    pub password: String,
}

pub fn is_valid_username(value: &str) -> bool {
    let count = value.chars().count();
    (1..=MAX_USERNAME_CHARS).contains(&count)
        && value
            .chars()
            .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'))
}

impl SignupForm {
    pub fn validate(&self) -> Result<SignupDraft, FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = self.username.trim();
        if required(&mut errors, "username", username) && !is_valid_username(username) {
            errors.push(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            errors.push(
                "password",
                format!("This password is too short. It must contain at least {MIN_PASSWORD_CHARS} characters."),
            );
        }
        if self.password != self.password_confirmation {
            errors.push(
                "password_confirmation",
                "The two password fields didn't match.",
            );
        }

        errors.into_result(SignupDraft {
            username: username.to_string(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        required(&mut errors, "username", &self.username);
        required(&mut errors, "password", &self.password);
        errors.into_result(())
    }
}
