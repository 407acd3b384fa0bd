mod form;
mod providers;
mod session;

use color_eyre::Result;
use paths::PathContext;
use serde::Serialize;

use crate::cli::Cmd;
use crate::config::Config;

pub async fn run(cmd: Cmd, config: &Config, paths: &PathContext) -> Result<()> {
    match cmd {
        Cmd::Providers => providers::run(),
        Cmd::Form { cmd } => form::run(cmd, config, paths).await,
        Cmd::Session { cmd } => session::run(cmd, paths).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
