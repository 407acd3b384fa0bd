mod cli;
mod commands;
mod config;
mod errors;
mod logging;
mod sender;

use clap::Parser;
use color_eyre::Result;
use paths::PathContext;

use crate::cli::Cli;
use crate::config::Config;

pub const APP_ID: &str = "console";

#[tokio::main]
pub async fn main() -> Result<()> {
    errors::init()?;
    let args = Cli::parse();

    let defaults = PathContext::new(APP_ID);
    let config = Config::new(&defaults)?;
    let paths = defaults.with_dirs(config.data_dir.clone(), config.config_dir.clone());
    paths.ensure_directories()?;

    let _log_guard = logging::init(&paths, &config.log_level)?;
    tracing::debug!(data_dir = %paths.data_dir().display(), "console started");

    commands::run(args.cmd, &config, &paths).await
}
