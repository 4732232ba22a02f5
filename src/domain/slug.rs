//! Group slug helpers.
//!
//! Slugs are URL path segments (`/group/{slug}/`). They may be typed by the
//! group creator or derived from the title through the `slug` crate.

use slug::slugify;
use thiserror::Error;

pub const MAX_SLUG_LEN: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(input);
    candidate.truncate(MAX_SLUG_LEN);
    let candidate = candidate.trim_end_matches('-').to_string();

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Letters, digits, hyphens and underscores only.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value.chars().count() <= MAX_SLUG_LEN
        && value
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '-' || ch == '_')
}
