use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use super::disconnect::DisconnectSignal;
use super::models::{DetachTrigger, RoomView, SessionRole, SessionState};
use crate::feedback::{FeedbackHandler, FeedbackSnapshot, FeedbackStream};
use crate::presence::{ClientId, PresenceError, PresenceLease, PresenceTracker, ReleaseOutcome};
use crate::room::RoomId;
use crate::shared::{AppError, RoomServices};
use crate::stats::aggregate;
use crate::store::StoreError;
use crate::subscription::{drive, Unsubscribe};

type PendingLease = JoinHandle<Result<PresenceLease, PresenceError>>;

/// One client's visit to one room.
///
/// Opening a session subscribes to feedback and presence while the
/// presence lease is acquired in the background; the session turns
/// `Active` once the lease lands. Leaving, the disconnect signal and
/// dropping the session all funnel into a single teardown that runs at
/// most once.
pub struct RoomSession {
    inner: Arc<SessionInner>,
    display_name: String,
    role: SessionRole,
    feedback: FeedbackStream,
    view: watch::Receiver<RoomView>,
    disconnect: DisconnectSignal,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

struct SessionInner {
    room_id: RoomId,
    client_id: ClientId,
    presence: PresenceTracker,
    release_timeout: Duration,
    state: watch::Sender<SessionState>,
    teardown: Mutex<Option<Teardown>>,
    entry_error: Mutex<Option<PresenceError>>,
}

/// Everything a live session holds open
struct Teardown {
    /// Empty until the background attach succeeds
    lease: Option<PresenceLease>,
    feedback: Unsubscribe,
    presence: Unsubscribe,
}

impl Teardown {
    async fn run(self, presence: &PresenceTracker, release_timeout: Duration) -> ReleaseOutcome {
        self.feedback.cancel();
        self.presence.cancel();

        match self.lease {
            Some(lease) => release(presence, &lease, release_timeout).await,
            None => ReleaseOutcome::NotAcquired,
        }
    }
}

async fn release(
    presence: &PresenceTracker,
    lease: &PresenceLease,
    release_timeout: Duration,
) -> ReleaseOutcome {
    match timeout(release_timeout, presence.detach(lease)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(
                room_id = %lease.room_id(),
                timeout_ms = release_timeout.as_millis() as u64,
                "Presence release timed out"
            );
            ReleaseOutcome::Failed
        }
    }
}

impl SessionInner {
    fn transition(&self, next: SessionState) {
        transition(&self.state, &self.room_id, next);
    }

    /// Runs the teardown if nobody has yet. Returns the release outcome for
    /// the caller that performed it.
    async fn shutdown(&self, trigger: DetachTrigger) -> Option<ReleaseOutcome> {
        let teardown = lock(&self.teardown).take();
        let Some(teardown) = teardown else {
            debug!(room_id = %self.room_id, trigger = %trigger, "Session already detached");
            return None;
        };

        info!(
            room_id = %self.room_id,
            client_id = %self.client_id,
            trigger = %trigger,
            "Leaving room"
        );

        self.transition(SessionState::Detaching);
        let outcome = teardown.run(&self.presence, self.release_timeout).await;
        self.transition(SessionState::Closed);

        info!(room_id = %self.room_id, outcome = %outcome, "Session closed");
        Some(outcome)
    }

    /// Hands the background attach result to the session. A lease that
    /// arrives after teardown started is released straight away.
    async fn install_lease(&self, acquired: Result<PresenceLease, PresenceError>) {
        let lease = match acquired {
            Ok(lease) => lease,
            Err(e) => {
                error!(room_id = %self.room_id, error = %e, "Failed to acquire presence");
                *lock(&self.entry_error) = Some(e);
                self.shutdown(DetachTrigger::PresenceFailure).await;
                return;
            }
        };

        let orphan = {
            let mut slot = lock(&self.teardown);
            match slot.as_mut() {
                Some(teardown) => {
                    teardown.lease = Some(lease);
                    self.transition(SessionState::Active);
                    None
                }
                None => Some(lease),
            }
        };

        match orphan {
            None => info!(
                room_id = %self.room_id,
                client_id = %self.client_id,
                "Entered room"
            ),
            Some(lease) => {
                debug!(room_id = %self.room_id, "Lease arrived after teardown, releasing it");
                release(&self.presence, &lease, self.release_timeout).await;
            }
        }
    }
}

fn transition(state: &watch::Sender<SessionState>, room_id: &RoomId, next: SessionState) {
    let current = *state.borrow();
    if !current.can_transition_to(next) {
        warn!(room_id = %room_id, from = %current, to = %next, "Ignoring invalid session transition");
        return;
    }

    debug!(room_id = %room_id, from = %current, to = %next, "Session state changed");
    state.send_replace(next);
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Recomputes statistics for every feedback snapshot and publishes both
struct ViewPublisher {
    view: Arc<watch::Sender<RoomView>>,
}

#[async_trait]
impl FeedbackHandler for ViewPublisher {
    async fn on_update(&self, room_id: &RoomId, snapshot: FeedbackSnapshot) {
        let stats = aggregate(snapshot.events());

        debug!(
            room_id = %room_id,
            events = snapshot.len(),
            average = ?stats.average,
            "Room statistics recomputed"
        );

        self.view.send_modify(move |view| {
            view.feedback = snapshot;
            view.stats = stats;
        });
    }

    fn handler_name(&self) -> &'static str {
        "ViewPublisher"
    }
}

impl RoomSession {
    /// Enters the room named by `room_code` and waits until the session is
    /// `Active`.
    ///
    /// Fails without touching the store when the code is malformed. If any
    /// setup step fails, whatever did succeed is undone before the error
    /// is returned.
    pub async fn enter(
        services: &RoomServices,
        room_code: &str,
        role: SessionRole,
    ) -> Result<Self, AppError> {
        let session = Self::open(services, room_code, role).await?;
        session.ready().await?;
        Ok(session)
    }

    /// Opens the room as soon as its subscriptions are live.
    ///
    /// The returned session is still `Attaching`: feedback and presence are
    /// already visible, but submitting waits for the presence lease. Use
    /// [`RoomSession::ready`] to wait for it.
    #[instrument(skip(services, role), fields(role = %role))]
    pub async fn open(
        services: &RoomServices,
        room_code: &str,
        role: SessionRole,
    ) -> Result<Self, AppError> {
        let (state, _) = watch::channel(SessionState::Idle);

        let room_id = match RoomId::parse(room_code) {
            Ok(room_id) => room_id,
            Err(e) => {
                warn!(room_code = %room_code, error = %e, "Rejected room code");
                return Err(e.into());
            }
        };

        let client_id = ClientId::new();
        let display_name = services.names.generate().await;
        transition(&state, &room_id, SessionState::Attaching);

        let attach: PendingLease = tokio::spawn({
            let presence = services.presence.clone();
            let room_id = room_id.clone();
            async move { presence.attach(&room_id, client_id).await }
        });

        let (view_tx, view_rx) = watch::channel(RoomView::new(room_id.clone()));
        let view_tx = Arc::new(view_tx);
        let publisher = Arc::new(ViewPublisher {
            view: Arc::clone(&view_tx),
        });

        let (feedback, presence_watch) = tokio::join!(
            services.feedback.subscribe(&room_id, publisher),
            observe_presence(&services.presence, &room_id, Arc::clone(&view_tx)),
        );

        let (feedback, presence_watch) = match (feedback, presence_watch) {
            (Ok(feedback), Ok(presence_watch)) => (feedback, presence_watch),
            (Err(e), _) => return Err(abort_entry(services, &state, &room_id, e.into(), attach)),
            (Ok(_), Err(e)) => {
                return Err(abort_entry(services, &state, &room_id, e.into(), attach))
            }
        };

        let inner = Arc::new(SessionInner {
            room_id,
            client_id,
            presence: services.presence.clone(),
            release_timeout: services.config.release_timeout,
            state,
            teardown: Mutex::new(Some(Teardown {
                lease: None,
                feedback,
                presence: presence_watch,
            })),
            entry_error: Mutex::new(None),
        });

        let disconnect = DisconnectSignal::new();
        let watcher = tokio::spawn({
            let inner = Arc::clone(&inner);
            let signal = disconnect.clone();
            async move {
                signal.fired().await;
                inner.shutdown(DetachTrigger::Disconnect).await;
            }
        });

        tokio::spawn({
            let inner = Arc::clone(&inner);
            async move {
                let acquired = attach.await.unwrap_or_else(|e| {
                    Err(PresenceError::StoreWrite(StoreError::unavailable(format!(
                        "presence attach task failed: {e}"
                    ))))
                });
                inner.install_lease(acquired).await;
            }
        });

        debug!(
            room_id = %inner.room_id,
            client_id = %inner.client_id,
            display_name = %display_name,
            "Room subscriptions live"
        );

        Ok(Self {
            inner,
            display_name,
            role,
            feedback: services.feedback.clone(),
            view: view_rx,
            disconnect,
            watcher: Mutex::new(Some(watcher)),
        })
    }

    /// Waits for the presence lease. Fails with the presence error if it
    /// could not be acquired, or `NotActive` if the session was left first.
    pub async fn ready(&self) -> Result<(), AppError> {
        let mut changes = self.inner.state.subscribe();
        let state = changes
            .wait_for(|state| *state != SessionState::Attaching)
            .await
            .map(|state| *state)
            .unwrap_or_else(|_| self.state());

        if state == SessionState::Active {
            return Ok(());
        }

        match lock(&self.inner.entry_error).clone() {
            Some(e) => Err(e.into()),
            None => Err(AppError::NotActive { state }),
        }
    }

    /// Leaves the room on navigation.
    ///
    /// Returns the release outcome if this call performed the teardown, or
    /// `None` if the session had already been detached. Either way the
    /// session is `Closed` when this returns.
    #[instrument(skip(self), fields(room_id = %self.inner.room_id))]
    pub async fn leave(&self) -> Option<ReleaseOutcome> {
        let outcome = self.inner.shutdown(DetachTrigger::Navigation).await;

        match outcome {
            Some(_) => {
                if let Some(watcher) = lock(&self.watcher).take() {
                    watcher.abort();
                }
            }
            None => {
                // Another path got there first
                let mut state = self.inner.state.subscribe();
                let _ = state.wait_for(|state| state.is_terminal()).await;
            }
        }

        outcome
    }

    /// Submits feedback under this session's display name
    #[instrument(skip(self, comment), fields(room_id = %self.inner.room_id))]
    pub async fn submit(&self, rating: i64, comment: &str) -> Result<(), AppError> {
        let state = self.state();
        if state != SessionState::Active {
            debug!(state = %state, "Feedback submitted outside an active session");
            return Err(AppError::NotActive { state });
        }

        self.feedback
            .submit(&self.inner.room_id, &self.display_name, rating, comment)
            .await?;
        Ok(())
    }

    pub fn room_id(&self) -> &RoomId {
        &self.inner.room_id
    }

    pub fn client_id(&self) -> ClientId {
        self.inner.client_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Live room view; every presence or feedback change publishes a new one
    pub fn view(&self) -> watch::Receiver<RoomView> {
        self.view.clone()
    }

    pub fn current_view(&self) -> RoomView {
        self.view.borrow().clone()
    }

    /// Handle for the UI's "about to unload" hook
    pub fn disconnect_signal(&self) -> DisconnectSignal {
        self.disconnect.clone()
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        if !self.state().is_terminal() {
            debug!(room_id = %self.inner.room_id, "Session dropped while attached");
            self.disconnect.fire();
        }
    }
}

async fn observe_presence(
    presence: &PresenceTracker,
    room_id: &RoomId,
    view: Arc<watch::Sender<RoomView>>,
) -> Result<Unsubscribe, PresenceError> {
    let counts = presence.observe(room_id).await?;

    Ok(drive("presence", room_id, counts, move |count| {
        let view = Arc::clone(&view);
        async move {
            view.send_modify(|view| view.present_count = count);
        }
    }))
}

/// Closes a session whose subscriptions failed. The lease still being
/// acquired is released once it arrives.
fn abort_entry(
    services: &RoomServices,
    state: &watch::Sender<SessionState>,
    room_id: &RoomId,
    error: AppError,
    attach: PendingLease,
) -> AppError {
    error!(room_id = %room_id, error = %error, "Failed to enter room");

    let presence = services.presence.clone();
    tokio::spawn(async move {
        if let Ok(Ok(lease)) = attach.await {
            presence.detach(&lease).await;
        }
    });

    transition(state, room_id, SessionState::Closed);
    error
}
