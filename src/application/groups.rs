use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, RepoError};
use crate::domain::entities::GroupRecord;
use crate::domain::forms::FieldErrors;
use crate::domain::groups::GroupForm;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug)]
pub enum GroupOutcome {
    Created(GroupRecord),
    Invalid(FieldErrors),
}

#[derive(Clone)]
pub struct GroupService {
    groups: Arc<dyn GroupsRepo>,
}

impl GroupService {
    pub fn new(groups: Arc<dyn GroupsRepo>) -> Self {
        Self { groups }
    }

    pub async fn create(&self, form: &GroupForm) -> Result<GroupOutcome, GroupError> {
        let draft = match form.validate() {
            Ok(draft) => draft,
            Err(errors) => return Ok(GroupOutcome::Invalid(errors)),
        };

        let slug_taken = || {
            let mut errors = FieldErrors::new();
            errors.push("slug", "Group with this Slug already exists.");
            GroupOutcome::Invalid(errors)
        };

        if self.groups.find_by_slug(&draft.slug).await?.is_some() {
            return Ok(slug_taken());
        }

        match self
            .groups
            .create_group(CreateGroupParams {
                title: draft.title,
                slug: draft.slug,
                description: draft.description,
            })
            .await
        {
            Ok(group) => {
                info!(
                    target = "postboard::application::groups",
                    slug = %group.slug,
                    "group created"
                );
                Ok(GroupOutcome::Created(group))
            }
            // Lost a race against a concurrent insert of the same slug.
            Err(RepoError::Duplicate { .. }) => Ok(slug_taken()),
            Err(err) => Err(err.into()),
        }
    }
}
