use serde::Deserialize;

use super::forms::{FieldErrors, required};
use super::slug::{MAX_SLUG_LEN, derive_slug, is_valid_slug};

pub const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GroupForm {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDraft {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl GroupForm {
    /// Field validation; slug uniqueness is decided by storage. A blank slug
    /// is derived from the title.
    pub fn validate(&self) -> Result<GroupDraft, FieldErrors> {
        let mut errors = FieldErrors::new();
        let title = self.title.trim();
        if required(&mut errors, "title", title) && title.chars().count() > MAX_TITLE_CHARS {
            errors.push(
                "title",
                format!("Ensure this value has at most {MAX_TITLE_CHARS} characters."),
            );
        }

        let slug = match self.slug.trim() {
            "" => match derive_slug(title) {
                Ok(slug) => slug,
                Err(_) => {
                    if !title.is_empty() {
                        errors.push("slug", "This field is required.");
                    }
                    String::new()
                }
            },
            typed if is_valid_slug(typed) => typed.to_string(),
            _ => {
                errors.push(
                    "slug",
                    format!(
                        "Enter a valid slug of at most {MAX_SLUG_LEN} letters, numbers, underscores or hyphens."
                    ),
                );
                String::new()
            }
        };

        required(&mut errors, "description", &self.description);

        errors.into_result(GroupDraft {
            title: title.to_string(),
            slug,
            description: self.description.trim().to_string(),
        })
    }
}
