//! Path context for runtime environment detection and the console's
//! well-known files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identifies the runtime environment where the application is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    /// Running via `cargo run` or in development mode
    Development,
    /// Running as an installed binary in production
    Production,
}

/// Data and config roots for one application.
#[derive(Debug, Clone)]
pub struct PathContext {
    environment: RuntimeEnvironment,
    data_dir: Arc<Path>,
    config_dir: Arc<Path>,
    /// Application identifier (e.g., "console"), also the env var prefix.
    app_id: &'static str,
}

impl PathContext {
    /// Creates a new PathContext with automatic environment detection.
    ///
    /// `<APP_ID>_DATA` and `<APP_ID>_CONFIG` override the detected roots.
    pub fn new(app_id: &'static str) -> Self {
        let environment = Self::detect_environment();
        let base = Self::determine_base_path(environment, app_id);
        let prefix = app_id.to_uppercase();

        let data_dir = env_dir(&format!("{prefix}_DATA")).unwrap_or_else(|| match environment {
            RuntimeEnvironment::Development => base.join(".data"),
            RuntimeEnvironment::Production => base.clone(),
        });
        let config_dir = env_dir(&format!("{prefix}_CONFIG")).unwrap_or_else(|| match environment {
            RuntimeEnvironment::Development => base.join(".config"),
            RuntimeEnvironment::Production => dirs::config_local_dir()
                .map(|d| d.join(app_id))
                .unwrap_or_else(|| base.join("config")),
        });

        Self {
            environment,
            data_dir: data_dir.into(),
            config_dir: config_dir.into(),
            app_id,
        }
    }

    /// Creates a PathContext under an explicit base path (useful for testing).
    pub fn with_base_path(base_path: PathBuf, app_id: &'static str) -> Self {
        Self {
            environment: Self::detect_environment(),
            data_dir: base_path.join("data").into(),
            config_dir: base_path.join("config").into(),
            app_id,
        }
    }

    /// Replace the roots, e.g. with values from a loaded configuration.
    pub fn with_dirs(mut self, data_dir: PathBuf, config_dir: PathBuf) -> Self {
        self.data_dir = data_dir.into();
        self.config_dir = config_dir.into();
        self
    }

    /// Detects the runtime environment based on executable location.
    fn detect_environment() -> RuntimeEnvironment {
        if let Ok(exe_path) = std::env::current_exe() {
            // target/debug or target/release
            if exe_path.components().any(|c| c.as_os_str() == "target") {
                return RuntimeEnvironment::Development;
            }
        }

        if std::env::var("CARGO").is_ok() || std::env::var("CARGO_MANIFEST_DIR").is_ok() {
            return RuntimeEnvironment::Development;
        }

        RuntimeEnvironment::Production
    }

    fn determine_base_path(environment: RuntimeEnvironment, app_id: &str) -> PathBuf {
        match environment {
            RuntimeEnvironment::Development => std::env::var("CARGO_MANIFEST_DIR")
                .map(PathBuf::from)
                .or_else(|_| std::env::current_dir())
                .unwrap_or_else(|_| PathBuf::from(".")),
            RuntimeEnvironment::Production => dirs::data_local_dir()
                .map(|d| d.join(app_id))
                .unwrap_or_else(|| PathBuf::from(".").join(".data")),
        }
    }

    pub fn environment(&self) -> RuntimeEnvironment {
        self.environment
    }

    pub fn app_id(&self) -> &str {
        self.app_id
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Candidate config files, in load order: `config.json5`, `config.toml`.
    pub fn config_files(&self) -> [PathBuf; 2] {
        [
            self.config_dir.join("config.json5"),
            self.config_dir.join("config.toml"),
        ]
    }

    /// Persisted session storage: `<data>/session.json`
    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    /// Returns the logs directory path: `<data>/logs/`
    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Returns a log file path with timestamp: `<data>/logs/<app_id>.<timestamp>.log`
    pub fn log_file(&self, timestamp: &str) -> PathBuf {
        self.logs_dir()
            .join(format!("{}.{}.log", self.app_id, timestamp))
    }

    /// Returns a log file path with current timestamp.
    pub fn log_file_now(&self) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        self.log_file(&timestamp)
    }

    /// Ensures all necessary directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [self.data_dir.to_path_buf(), self.config_dir.to_path_buf(), self.logs_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}

fn env_dir(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
