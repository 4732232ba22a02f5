use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{
        accounts::AccountError, feed::FeedError, follows::FollowError, groups::GroupError,
        posts::PostError, repos::RepoError,
    },
    domain::error::DomainError,
    infra::{error::InfraError, uploads::UploadStorageError},
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn into_report(self) -> ErrorReport {
        self.report
    }

    /// Maps storage failures onto the status codes clients see.
    pub fn from_repo(source: &'static str, error: &RepoError) -> Self {
        let (status, message) = match error {
            RepoError::Duplicate { .. } => (StatusCode::CONFLICT, "Duplicate record"),
            RepoError::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
            RepoError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "Invalid input"),
            RepoError::Integrity { .. } => (StatusCode::CONFLICT, "Integrity constraint violated"),
            RepoError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, "Database timeout"),
            RepoError::Persistence(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        Self::from_error(source, status, message, error)
    }

    fn from_domain(source: &'static str, error: &DomainError) -> Self {
        match error {
            DomainError::NotFound { .. } => {
                Self::from_error(source, StatusCode::NOT_FOUND, "Not found", error)
            }
            DomainError::Validation { .. } => Self::from_error(
                source,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                error,
            ),
        }
    }

    fn internal(source: &'static str, error: &dyn StdError) -> Self {
        Self::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            error,
        )
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<DomainError> for HttpError {
    fn from(error: DomainError) -> Self {
        Self::from_domain("application::error::domain", &error)
    }
}

impl From<RepoError> for HttpError {
    fn from(error: RepoError) -> Self {
        Self::from_repo("application::error::repo", &error)
    }
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        const SOURCE: &str = "application::feed";
        match error {
            FeedError::Domain(err) => Self::from_domain(SOURCE, &err),
            FeedError::Repo(err) => Self::from_repo(SOURCE, &err),
        }
    }
}

impl From<PostError> for HttpError {
    fn from(error: PostError) -> Self {
        const SOURCE: &str = "application::posts";
        match error {
            PostError::Domain(err) => Self::from_domain(SOURCE, &err),
            PostError::Repo(err) => Self::from_repo(SOURCE, &err),
            PostError::Storage(UploadStorageError::EmptyPayload) => Self::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Empty upload",
                "uploaded image had no content",
            ),
            PostError::Storage(err) => Self::internal(SOURCE, &err),
        }
    }
}

impl From<FollowError> for HttpError {
    fn from(error: FollowError) -> Self {
        const SOURCE: &str = "application::follows";
        match error {
            FollowError::Domain(err) => Self::from_domain(SOURCE, &err),
            FollowError::Repo(err) => Self::from_repo(SOURCE, &err),
        }
    }
}

impl From<GroupError> for HttpError {
    fn from(error: GroupError) -> Self {
        match error {
            GroupError::Repo(err) => Self::from_repo("application::groups", &err),
        }
    }
}

impl From<AccountError> for HttpError {
    fn from(error: AccountError) -> Self {
        const SOURCE: &str = "application::accounts";
        match error {
            AccountError::Repo(err) => Self::from_repo(SOURCE, &err),
            err @ AccountError::Hashing(_) => Self::internal(SOURCE, &err),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Infra(err) if err.is_database() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Infra(_) | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) => "Resource not found",
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => {
                "Request could not be processed"
            }
            AppError::Infra(InfraError::DatabaseConnect(_) | InfraError::Migrate(_)) => {
                "Database unavailable"
            }
            AppError::Infra(InfraError::Configuration(_)) => "Service misconfigured",
            AppError::Infra(InfraError::Subscriber(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Uploads { .. }) => "Upload storage unavailable",
            AppError::Infra(InfraError::Bind { .. }) => "Listener could not start",
            AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.presentation_message();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, message).into_response();
        report.attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_errors_map_to_statuses() {
        let duplicate = RepoError::Duplicate {
            constraint: "groups_slug_key".into(),
        };
        assert_eq!(
            HttpError::from_repo("test", &duplicate).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            HttpError::from_repo("test", &RepoError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            HttpError::from_repo("test", &RepoError::from_persistence("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn missing_entities_become_not_found() {
        let error: HttpError = FeedError::from(DomainError::not_found("group", "cats")).into();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        let report = error.into_report();
        assert_eq!(report.source, "application::feed");
        assert_eq!(report.messages[0], "group `cats` not found");
    }

    #[test]
    fn app_error_response_carries_report() {
        let response = AppError::validation("bad").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.messages, vec!["validation failed: bad".to_string()]);
    }
}
