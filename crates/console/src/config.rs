use std::path::PathBuf;

use paths::PathContext;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_API_BASE_URL: &str = "https://localhost:4055";
pub const DEFAULT_API_PREFIX: &str = "/certwarden/api/v1";
const PROVIDERS_ENDPOINT: &str = "/challenges/providers/services";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub api_prefix: String,
    pub log_level: String,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    pub data_dir: PathBuf,
    pub config_dir: PathBuf,
}

impl Config {
    /// Defaults, then `config.json5` / `config.toml` from the config
    /// directory, then `CONSOLE_*` environment variables.
    pub fn new(paths: &PathContext) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("api_prefix", DEFAULT_API_PREFIX)?
            .set_default("log_level", "info")?
            .set_default("accept_invalid_certs", false)?
            .set_default("data_dir", paths.data_dir().to_string_lossy().as_ref())?
            .set_default("config_dir", paths.config_dir().to_string_lossy().as_ref())?;

        let formats = [config::FileFormat::Json5, config::FileFormat::Toml];
        for (file, format) in paths.config_files().into_iter().zip(formats) {
            if file.exists() {
                debug!(file = %file.display(), "loading config file");
            }
            builder = builder.add_source(config::File::from(file).format(format).required(false));
        }

        let cfg: Self = builder
            .add_source(config::Environment::with_prefix("CONSOLE").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(cfg)
    }

    pub fn api_url(&self) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            self.api_prefix.trim_matches('/')
        )
    }

    /// Collection endpoint for challenge provider records.
    pub fn providers_url(&self) -> String {
        format!("{}{PROVIDERS_ENDPOINT}", self.api_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_and_file_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = PathContext::with_base_path(tmp.path().to_path_buf(), "console");
        std::fs::create_dir_all(paths.config_dir()).unwrap();

        let cfg = Config::new(&paths).unwrap();
        assert_eq!(cfg.api_url(), "https://localhost:4055/certwarden/api/v1");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.data_dir, paths.data_dir());

        std::fs::write(
            paths.config_dir().join("config.json5"),
            "{ api_base_url: 'https://certs.internal/', log_level: 'debug' }",
        )
        .unwrap();
        let cfg = Config::new(&paths).unwrap();
        assert_eq!(
            cfg.providers_url(),
            "https://certs.internal/certwarden/api/v1/challenges/providers/services"
        );
        assert_eq!(cfg.log_level, "debug");
    }
}
