//! Local-network file sharing over HTTP.
//!
//! This crate exposes a directory tree below a configured working directory.
//! Clients can browse folders and download single files, optionally gated by a
//! shared secret sent in the `X-Teilen-Auth` header.

pub mod auth;
pub mod banner;
pub mod config;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod listing;
pub mod resolver;
pub mod routes;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use config::{AppConfig, Mode};
pub use error::ContentError;
pub use resolver::{PathResolver, Rejection};

/// Application state shared across handlers.
///
/// Built once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Canonical root directory; nothing outside it is ever served.
    pub root_dir: Arc<PathBuf>,
    /// Shared secret, `None` when authentication is disabled.
    pub password: Option<Arc<str>>,
    /// Full configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Create the state from a loaded configuration.
    ///
    /// Canonicalizes the working directory, which must exist and be a directory.
    pub fn from_config(config: AppConfig) -> std::io::Result<Self> {
        let root_dir = config.working_dir.canonicalize()?;
        if !root_dir.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("working directory is not a directory: {}", root_dir.display()),
            ));
        }

        let password = if config.password_required() {
            config.password.as_deref().map(Arc::from)
        } else {
            None
        };

        Ok(Self {
            root_dir: Arc::new(root_dir),
            password,
            config: Arc::new(config),
        })
    }

    /// Root directory all requested locations are confined to.
    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Resolver bound to the host filesystem and this state's root.
    pub fn resolver(&self) -> PathResolver {
        PathResolver::new((*self.root_dir).clone())
    }
}
