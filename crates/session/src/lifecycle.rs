//! Session state machine.
//!
//! ```text
//! LoggedOut --authenticate(record)--> LoggedIn(expiry)      (expiry > now)
//! LoggedIn  --authenticate(record)--> LoggedIn(new expiry)  (timer replaced)
//! LoggedIn  --logout-----------------> LoggedOut             (record deleted)
//! LoggedIn  --idle timer fires-------> LoggedOut             (record deleted)
//! ```
//!
//! Every entry into `LoggedIn` cancels the pending timer and schedules exactly
//! one new timer for `expiry - now`. Timers carry a generation number so a
//! timer that fires concurrently with its own cancellation is ignored.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use strum::Display;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::SessionError;
use crate::record::StoredAuthorization;
use crate::storage::{AUTH_STORAGE_KEY, SessionStorage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn { expiry: i64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LogoutReason {
    Logout,
    IdleTimeout,
    /// The stored record was already expired on restore.
    Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { expiry: i64 },
    LoggedOut(LogoutReason),
}

struct PendingTimer {
    generation: u64,
    cancel: CancellationToken,
}

struct Machine {
    state: SessionState,
    record: Option<StoredAuthorization>,
    timer: Option<PendingTimer>,
    generation: u64,
}

struct Inner {
    storage: Arc<dyn SessionStorage>,
    clock: Arc<dyn Clock>,
    events: Option<UnboundedSender<SessionEvent>>,
    machine: Mutex<Machine>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = self.lock().timer.take() {
            timer.cancel.cancel();
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn cancel_timer(machine: &mut Machine) {
        if let Some(timer) = machine.timer.take() {
            debug!(generation = timer.generation, "idle timer cancelled");
            timer.cancel.cancel();
        }
    }

    /// Transition to `LoggedOut`: cancel the timer and delete the record.
    fn log_out(&self, machine: &mut Machine, reason: LogoutReason) -> Result<(), SessionError> {
        Self::cancel_timer(machine);
        let was_logged_in = matches!(machine.state, SessionState::LoggedIn { .. });
        machine.state = SessionState::LoggedOut;
        machine.record = None;
        let removed = self.storage.remove(AUTH_STORAGE_KEY);
        if was_logged_in {
            info!(%reason, "session logged out");
            self.emit(SessionEvent::LoggedOut(reason));
        }
        removed
    }

    fn on_timer(&self, generation: u64) {
        let mut machine = self.lock();
        if machine.timer.as_ref().map(|t| t.generation) != Some(generation) {
            debug!(generation, "stale idle timer ignored");
            return;
        }
        machine.timer = None;
        if let Err(e) = self.log_out(&mut machine, LogoutReason::IdleTimeout) {
            warn!("failed to clear session after idle timeout: {e}");
        }
    }
}

/// Cloneable handle to the single session service.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub fn new(storage: Arc<dyn SessionStorage>, clock: Arc<dyn Clock>) -> Self {
        Self::build(storage, clock, None)
    }

    /// Like [`Session::new`], plus a channel of lifecycle events.
    pub fn with_events(
        storage: Arc<dyn SessionStorage>,
        clock: Arc<dyn Clock>,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self::build(storage, clock, Some(tx)), rx)
    }

    fn build(
        storage: Arc<dyn SessionStorage>,
        clock: Arc<dyn Clock>,
        events: Option<UnboundedSender<SessionEvent>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage,
                clock,
                events,
                machine: Mutex::new(Machine {
                    state: SessionState::LoggedOut,
                    record: None,
                    timer: None,
                    generation: 0,
                }),
            }),
        }
    }

    /// Derive the state from storage. An absent, expired or malformed record
    /// leaves the session `LoggedOut` with the record deleted; a valid one
    /// enters `LoggedIn` and arms the idle timer.
    pub fn restore(&self) -> Result<SessionState, SessionError> {
        let raw = self.inner.storage.read(AUTH_STORAGE_KEY)?;
        let now = self.inner.clock.now_unix();
        let parsed = raw.map(|raw| serde_json::from_str::<StoredAuthorization>(&raw));
        match parsed {
            Some(Ok(record)) if record.is_valid_at(now) => {
                self.enter(record, &current_runtime()?);
            }
            Some(Ok(record)) => {
                warn!(
                    expiry = record.session_expiry_unix_seconds,
                    now, "stored session expired, deleting"
                );
                let mut machine = self.inner.lock();
                let was_logged_in = matches!(machine.state, SessionState::LoggedIn { .. });
                let removed = self.inner.log_out(&mut machine, LogoutReason::Expired);
                if !was_logged_in {
                    self.inner.emit(SessionEvent::LoggedOut(LogoutReason::Expired));
                }
                removed?;
            }
            Some(Err(e)) => {
                warn!("stored session is malformed, deleting: {e}");
                let mut machine = self.inner.lock();
                self.inner.log_out(&mut machine, LogoutReason::Logout)?;
            }
            None => {
                let mut machine = self.inner.lock();
                self.inner.log_out(&mut machine, LogoutReason::Logout)?;
            }
        }
        Ok(self.state())
    }

    /// Log in (or re-authenticate) with a fresh record.
    pub fn authenticate(&self, record: StoredAuthorization) -> Result<SessionState, SessionError> {
        let now = self.inner.clock.now_unix();
        if !record.is_valid_at(now) {
            return Err(SessionError::AlreadyExpired {
                expiry: record.session_expiry_unix_seconds,
                now,
            });
        }
        let runtime = current_runtime()?;
        self.inner
            .storage
            .write(AUTH_STORAGE_KEY, &serde_json::to_string(&record)?)?;
        self.enter(record, &runtime);
        Ok(self.state())
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        let mut machine = self.inner.lock();
        self.inner.log_out(&mut machine, LogoutReason::Logout)
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.state(), SessionState::LoggedIn { .. })
    }

    /// The current record, unless it has expired in the meantime.
    pub fn authorization(&self) -> Option<StoredAuthorization> {
        let now = self.inner.clock.now_unix();
        self.inner
            .lock()
            .record
            .clone()
            .filter(|r| r.is_valid_at(now))
    }

    pub fn has_pending_timer(&self) -> bool {
        self.inner.lock().timer.is_some()
    }

    fn enter(&self, record: StoredAuthorization, runtime: &Handle) {
        let delay = record.remaining(self.inner.clock.now_unix());
        let deadline = tokio::time::Instant::now() + delay;
        let expiry = record.session_expiry_unix_seconds;

        let mut machine = self.inner.lock();
        Inner::cancel_timer(&mut machine);
        machine.generation += 1;
        let generation = machine.generation;
        let cancel = CancellationToken::new();
        machine.timer = Some(PendingTimer {
            generation,
            cancel: cancel.clone(),
        });
        machine.state = SessionState::LoggedIn { expiry };
        machine.record = Some(record);
        drop(machine);

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.on_timer(generation);
                    }
                }
            }
        });

        info!(expiry, delay_secs = delay.as_secs(), "session logged in");
        self.inner.emit(SessionEvent::LoggedIn { expiry });
    }
}

fn current_runtime() -> Result<Handle, SessionError> {
    Handle::try_current().map_err(|_| SessionError::NoRuntime)
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("pending_timer", &self.has_pending_timer())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;

    const START: i64 = 1_000;

    struct Fixture {
        clock: Arc<ManualClock>,
        storage: Arc<MemoryStorage>,
        session: Session,
        events: UnboundedReceiver<SessionEvent>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(START));
        let storage = Arc::new(MemoryStorage::default());
        let (session, events) = Session::with_events(storage.clone(), clock.clone());
        Fixture {
            clock,
            storage,
            session,
            events,
        }
    }

    impl Fixture {
        async fn elapse(&self, secs: u64) {
            self.clock.advance(secs as i64);
            tokio::time::advance(Duration::from_secs(secs)).await;
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timer_logs_out_at_expiry() {
        let mut f = fixture();
        f.session
            .authenticate(StoredAuthorization::new("tok", START + 5))
            .unwrap();
        assert_eq!(f.events.recv().await, Some(SessionEvent::LoggedIn { expiry: START + 5 }));
        assert!(f.session.has_pending_timer());

        f.elapse(4).await;
        assert!(f.session.is_logged_in());
        assert_eq!(f.events.try_recv(), Err(TryRecvError::Empty));

        f.elapse(1).await;
        assert_eq!(
            f.events.recv().await,
            Some(SessionEvent::LoggedOut(LogoutReason::IdleTimeout))
        );
        assert_eq!(f.session.state(), SessionState::LoggedOut);
        assert!(!f.session.has_pending_timer());
        assert_eq!(f.storage.read(AUTH_STORAGE_KEY).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn reauthentication_replaces_the_timer() {
        let mut f = fixture();
        f.session.authenticate(StoredAuthorization::new("a", START + 5)).unwrap();
        f.elapse(3).await;
        f.session.authenticate(StoredAuthorization::new("b", START + 10)).unwrap();

        // Original expiry passes without a logout.
        f.elapse(3).await;
        assert_eq!(f.session.state(), SessionState::LoggedIn { expiry: START + 10 });
        assert_eq!(f.session.authorization().map(|r| r.access_token), Some("b".into()));

        f.elapse(4).await;
        assert_eq!(f.session.state(), SessionState::LoggedOut);

        let mut seen = Vec::new();
        while let Ok(event) = f.events.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                SessionEvent::LoggedIn { expiry: START + 5 },
                SessionEvent::LoggedIn { expiry: START + 10 },
                SessionEvent::LoggedOut(LogoutReason::IdleTimeout),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_logout_cancels_timer() {
        let mut f = fixture();
        f.session.authenticate(StoredAuthorization::new("a", START + 5)).unwrap();
        f.session.logout().unwrap();
        assert!(!f.session.has_pending_timer());
        assert_eq!(f.storage.read(AUTH_STORAGE_KEY).unwrap(), None);

        f.elapse(10).await;
        let mut seen = Vec::new();
        while let Ok(event) = f.events.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                SessionEvent::LoggedIn { expiry: START + 5 },
                SessionEvent::LoggedOut(LogoutReason::Logout),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expired_record_on_restore_is_deleted() {
        let mut f = fixture();
        let record = StoredAuthorization::new("old", START - 1);
        f.storage
            .write(AUTH_STORAGE_KEY, &serde_json::to_string(&record).unwrap())
            .unwrap();

        assert_eq!(f.session.restore().unwrap(), SessionState::LoggedOut);
        assert_eq!(f.storage.read(AUTH_STORAGE_KEY).unwrap(), None);
        assert_eq!(
            f.events.try_recv(),
            Ok(SessionEvent::LoggedOut(LogoutReason::Expired))
        );
        assert_eq!(f.events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_record_on_restore_is_deleted() {
        let f = fixture();
        f.storage.write(AUTH_STORAGE_KEY, "{\"accessToken\":").unwrap();
        assert_eq!(f.session.restore().unwrap(), SessionState::LoggedOut);
        assert_eq!(f.storage.read(AUTH_STORAGE_KEY).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn valid_record_on_restore_arms_timer() {
        let f = fixture();
        let record = StoredAuthorization::new("tok", START + 60).with_user_type("local");
        f.storage
            .write(AUTH_STORAGE_KEY, &serde_json::to_string(&record).unwrap())
            .unwrap();
        assert_eq!(f.session.restore().unwrap(), SessionState::LoggedIn { expiry: START + 60 });
        assert!(f.session.has_pending_timer());
        assert_eq!(f.session.authorization(), Some(record));
    }

    #[tokio::test]
    async fn expired_login_is_rejected() {
        let f = fixture();
        let err = f
            .session
            .authenticate(StoredAuthorization::new("tok", START))
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyExpired { expiry: START, now: START }));
        assert_eq!(f.session.state(), SessionState::LoggedOut);
    }

    #[test]
    fn timer_needs_runtime() {
        let f = fixture();
        let err = f
            .session
            .authenticate(StoredAuthorization::new("tok", START + 5))
            .unwrap_err();
        assert!(matches!(err, SessionError::NoRuntime));
        assert_eq!(f.storage.read(AUTH_STORAGE_KEY).unwrap(), None);
    }

    fn drain(events: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn restore_over_live_session_follows_storage() {
        let mut f = fixture();
        f.session.authenticate(StoredAuthorization::new("a", START + 100)).unwrap();
        let expired = StoredAuthorization::new("old", START - 1);
        f.storage
            .write(AUTH_STORAGE_KEY, &serde_json::to_string(&expired).unwrap())
            .unwrap();

        assert_eq!(f.session.restore().unwrap(), SessionState::LoggedOut);
        assert_eq!(f.session.state(), SessionState::LoggedOut);
        assert!(!f.session.has_pending_timer());
        assert_eq!(f.storage.read(AUTH_STORAGE_KEY).unwrap(), None);

        f.session.authenticate(StoredAuthorization::new("b", START + 100)).unwrap();
        f.storage.remove(AUTH_STORAGE_KEY).unwrap();
        assert_eq!(f.session.restore().unwrap(), SessionState::LoggedOut);
        assert_eq!(f.session.authorization(), None);
        assert!(!f.session.has_pending_timer());

        f.elapse(200).await;
        assert_eq!(
            drain(&mut f.events),
            vec![
                SessionEvent::LoggedIn { expiry: START + 100 },
                SessionEvent::LoggedOut(LogoutReason::Expired),
                SessionEvent::LoggedIn { expiry: START + 100 },
                SessionEvent::LoggedOut(LogoutReason::Logout),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restore_without_record_is_silent() {
        let mut f = fixture();
        assert_eq!(f.session.restore().unwrap(), SessionState::LoggedOut);
        assert_eq!(drain(&mut f.events), vec![]);
    }

    /// Memory storage whose deletes always fail.
    #[derive(Default)]
    struct StuckStorage(MemoryStorage);

    impl SessionStorage for StuckStorage {
        fn read(&self, key: &str) -> Result<Option<String>, SessionError> {
            self.0.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<(), SessionError> {
            self.0.write(key, value)
        }

        fn remove(&self, _key: &str) -> Result<(), SessionError> {
            Err(SessionError::Io(std::io::Error::other("read-only storage")))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_is_announced_when_delete_fails() {
        let clock = Arc::new(ManualClock::new(START));
        let (session, mut events) =
            Session::with_events(Arc::new(StuckStorage::default()), clock.clone());
        session.authenticate(StoredAuthorization::new("tok", START + 5)).unwrap();

        clock.advance(5);
        tokio::time::advance(Duration::from_secs(5)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        assert_eq!(session.state(), SessionState::LoggedOut);
        assert!(!session.has_pending_timer());
        assert_eq!(
            drain(&mut events),
            vec![
                SessionEvent::LoggedIn { expiry: START + 5 },
                SessionEvent::LoggedOut(LogoutReason::IdleTimeout),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn logout_reports_failed_delete_after_announcing() {
        let clock = Arc::new(ManualClock::new(START));
        let (session, mut events) =
            Session::with_events(Arc::new(StuckStorage::default()), clock);
        session.authenticate(StoredAuthorization::new("tok", START + 5)).unwrap();

        assert!(matches!(session.logout(), Err(SessionError::Io(_))));
        assert_eq!(session.state(), SessionState::LoggedOut);
        assert_eq!(
            drain(&mut events).last(),
            Some(&SessionEvent::LoggedOut(LogoutReason::Logout))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timer_deadline_counts_from_login() {
        let mut f = fixture();
        f.session.authenticate(StoredAuthorization::new("tok", START + 5)).unwrap();

        // No yield between login and the clock moving past expiry.
        f.elapse(5).await;
        assert_eq!(f.session.state(), SessionState::LoggedOut);
        assert_eq!(
            drain(&mut f.events),
            vec![
                SessionEvent::LoggedIn { expiry: START + 5 },
                SessionEvent::LoggedOut(LogoutReason::IdleTimeout),
            ]
        );
    }
}
