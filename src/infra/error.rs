//! Start-up failures of the adapters `main` wires together.

use std::{io, net::SocketAddr, path::PathBuf};

use thiserror::Error;
use tracing_subscriber::util::TryInitError;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
    #[error("failed to connect to the database: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("failed to apply database migrations: {0}")]
    Migrate(#[source] sqlx::Error),
    #[error("upload directory `{}` is unusable: {source}", .directory.display())]
    Uploads {
        directory: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

impl InfraError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the failure came from Postgres rather than local set-up.
    pub fn is_database(&self) -> bool {
        matches!(self, Self::DatabaseConnect(_) | Self::Migrate(_))
    }
}
