//! Session lifecycle for the admin console.
//!
//! A [`Session`] is an explicit service: construct it once at startup with a
//! [`SessionStorage`] backend and a [`Clock`], then pass it to whatever needs
//! to know whether the user is logged in. It owns at most one pending
//! idle-logout timer, keyed to the stored record's expiry.

mod clock;
mod error;
mod lifecycle;
mod record;
mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::SessionError;
pub use lifecycle::{LogoutReason, Session, SessionEvent, SessionState};
pub use record::StoredAuthorization;
pub use storage::{AUTH_STORAGE_KEY, FileStorage, MemoryStorage, SessionStorage};
