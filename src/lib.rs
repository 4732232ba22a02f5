//! Postboard: a small community blog with groups, comments and author subscriptions.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
