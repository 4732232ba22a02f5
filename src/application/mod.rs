//! Application services: feeds, authoring, follows, groups and accounts.

pub mod accounts;
pub mod error;
pub mod feed;
pub mod follows;
pub mod groups;
pub mod pagination;
pub mod posts;
pub mod repos;
