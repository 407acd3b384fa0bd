use std::sync::Arc;

use chrono::DateTime;
use color_eyre::{Result, eyre::eyre};
use paths::PathContext;
use session::{
    Clock, FileStorage, Session, SessionEvent, SessionState, StoredAuthorization, SystemClock,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::cli::SessionCmd;

pub async fn run(cmd: SessionCmd, paths: &PathContext) -> Result<()> {
    match cmd {
        SessionCmd::Login {
            token,
            expires_in,
            user_type,
        } => {
            let session = open(paths);
            let expiry = expiry_after(SystemClock.now_unix(), expires_in)?;
            let mut record = StoredAuthorization::new(token, expiry);
            if let Some(user_type) = user_type {
                record = record.with_user_type(user_type);
            }
            let state = session.authenticate(record)?;
            println!("{}", describe(state));
        }
        SessionCmd::Logout => {
            let session = open(paths);
            session.restore()?;
            session.logout()?;
            println!("logged out");
        }
        SessionCmd::Status => {
            let session = open(paths);
            println!("{}", describe(session.restore()?));
        }
        SessionCmd::Watch => {
            let (session, events) = open_with_events(paths);
            let state = session.restore()?;
            println!("{}", describe(state));
            if matches!(state, SessionState::LoggedIn { .. }) {
                watch(events).await?;
            }
        }
    }
    Ok(())
}

/// Session backed by the data directory's session file.
pub fn open(paths: &PathContext) -> Session {
    Session::new(
        Arc::new(FileStorage::new(paths.session_file())),
        Arc::new(SystemClock),
    )
}

fn open_with_events(paths: &PathContext) -> (Session, UnboundedReceiver<SessionEvent>) {
    Session::with_events(
        Arc::new(FileStorage::new(paths.session_file())),
        Arc::new(SystemClock),
    )
}

async fn watch(mut events: UnboundedReceiver<SessionEvent>) -> Result<()> {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::LoggedOut(reason)) => {
                    println!("logged out ({reason})");
                    return Ok(());
                }
                Some(SessionEvent::LoggedIn { expiry }) => info!(expiry, "session active"),
                None => return Err(eyre!("session event channel closed")),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("watch interrupted");
                return Ok(());
            }
        }
    }
}

fn expiry_after(now: i64, expires_in: u64) -> Result<i64> {
    i64::try_from(expires_in)
        .ok()
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| eyre!("--expires-in {expires_in} is out of range"))
}

fn describe(state: SessionState) -> String {
    match state {
        SessionState::LoggedOut => "logged out".to_string(),
        SessionState::LoggedIn { expiry } => match DateTime::from_timestamp(expiry, 0) {
            Some(at) => format!("logged in until {}", at.to_rfc3339()),
            None => format!("logged in until unix {expiry}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn expiry_is_offset_from_now() {
        assert_eq!(expiry_after(1_000, 3_600).unwrap(), 4_600);
    }

    #[test]
    fn oversized_expiry_is_an_error() {
        let err = expiry_after(1_700_000_000, u64::MAX).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(expiry_after(1_700_000_000, i64::MAX as u64).is_err());
    }

    #[test]
    fn describe_logged_out() {
        assert_eq!(describe(SessionState::LoggedOut), "logged out");
    }
}
