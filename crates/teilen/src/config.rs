use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Prefix for environment variable overrides (`TEILEN_PORT`, `TEILEN_PASSWORD`, ...).
pub const ENV_PREFIX: &str = "TEILEN";

/// Runtime mode. Anything but `prod` is meant for local development only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Prod,
    Dev,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Prod => f.write_str("prod"),
            Mode::Dev => f.write_str("dev"),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory to share
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Shared secret expected in the `X-Teilen-Auth` header
    #[serde(default)]
    pub password: Option<String>,

    /// Address to bind to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub mode: Mode,

    /// Directory containing the web UI build (served for all other paths)
    #[serde(default)]
    pub static_path: Option<PathBuf>,

    /// Origin allowed by CORS in dev mode
    #[serde(default = "default_dev_cors_frontend_url")]
    pub dev_cors_frontend_url: String,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    27183
}

fn default_dev_cors_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            password: None,
            bind: default_bind(),
            port: default_port(),
            mode: Mode::default(),
            static_path: None,
            dev_cors_frontend_url: default_dev_cors_frontend_url(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional TOML file and `TEILEN_*` environment variables.
    ///
    /// Later sources win. A missing file is an error only when a path was given explicitly.
    /// This is the only place the environment is consulted.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with_env(file, Environment::with_prefix(ENV_PREFIX).separator("__"))
    }

    /// [`AppConfig::load`] with an explicit environment source.
    pub fn load_with_env(file: Option<&Path>, env: Environment) -> Result<Self> {
        let defaults = AppConfig::default();
        let mut builder = Config::builder()
            .set_default("working_dir", defaults.working_dir.display().to_string())?
            .set_default("bind", defaults.bind)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("mode", defaults.mode.to_string())?
            .set_default("dev_cors_frontend_url", defaults.dev_cors_frontend_url)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let built = builder
            .add_source(env)
            .build()
            .context("building configuration")?;

        built
            .try_deserialize()
            .context("deserializing configuration")
    }

    /// Render the effective configuration as TOML with the password masked.
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut redacted = self.clone();
        if redacted.password.is_some() {
            redacted.password = Some("********".to_string());
        }
        toml::to_string_pretty(&redacted).context("serializing config to TOML")
    }

    pub fn password_required(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}
