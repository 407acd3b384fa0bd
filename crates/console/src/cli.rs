use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "console", version, about = "Certificate admin console (headless)")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// List the registered challenge provider types
    Providers,
    /// Build, validate and submit provider forms
    Form {
        #[command(subcommand)]
        cmd: FormCmd,
    },
    /// Log in, log out and inspect the stored session
    Session {
        #[command(subcommand)]
        cmd: SessionCmd,
    },
}

#[derive(Subcommand)]
pub enum FormCmd {
    /// Blank form for a provider type, then apply change events
    New {
        #[arg(long)]
        provider: String,
        /// JSON-lines file of change / add / remove events
        #[arg(long)]
        changes: Option<PathBuf>,
    },
    /// Form for an existing provider record, then apply change events
    Edit {
        #[arg(long)]
        provider: String,
        /// Persisted provider record (`{"type", "domains", "config"}`)
        #[arg(long)]
        persisted: PathBuf,
        #[arg(long)]
        changes: Option<PathBuf>,
    },
    /// Print the validation error map of a form document
    Validate {
        #[arg(long)]
        input: PathBuf,
    },
    /// Validate, then create (POST) or update (PUT) the provider
    Submit {
        #[arg(long)]
        input: PathBuf,
        /// Existing provider id; omit to create
        #[arg(long)]
        id: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum SessionCmd {
    /// Store a new authorization record
    Login {
        #[arg(long)]
        token: String,
        /// Seconds until the session expires
        #[arg(long)]
        expires_in: u64,
        #[arg(long)]
        user_type: Option<String>,
    },
    Logout,
    Status,
    /// Block until the idle timer logs the session out
    Watch,
}
