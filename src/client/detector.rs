//! Client-side session state machine.
//!
//! ```text
//! (initial) --login--> ACTIVE | LIMIT_PENDING
//! LIMIT_PENDING --evict_and_retry--> ACTIVE | LIMIT_PENDING
//! ACTIVE --poll--> ACTIVE | EVICTED
//! EVICTED --acknowledge_eviction--> LOGGED_OUT
//! any --logout--> LOGGED_OUT
//! ```
//!
//! The registry has no push channel, so an evicted device only learns about it
//! on its next `refresh` resolve.

use rand::Rng;
use std::{future::Future, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{api::SessionApi, error::ClientError};
use crate::registry::{AccountView, DeviceView, Outcome, ResolveMode};

/// Interval between re-checks, matching the browser client.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on the random delay added to each poll, as a fraction of the
/// interval.
const POLL_JITTER: f64 = 0.1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Initial,
    Active {
        account: AccountView,
        profile_complete: bool,
    },
    LimitPending {
        user_id: Uuid,
        devices: Vec<DeviceView>,
    },
    Evicted,
    LoggedOut,
}

impl SessionState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Active { .. } => "active",
            Self::LimitPending { .. } => "limit pending",
            Self::Evicted => "evicted",
            Self::LoggedOut => "logged out",
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::Active { account, .. } => Some(account.user_id),
            Self::LimitPending { user_id, .. } => Some(*user_id),
            Self::Initial | Self::Evicted | Self::LoggedOut => None,
        }
    }

    /// Polling stops in these states.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Evicted | Self::LoggedOut)
    }
}

pub struct InvalidationDetector<A> {
    api: A,
    email: String,
    device_id: String,
    device_name: String,
    state: SessionState,
    /// Last account id seen, kept after eviction so logout can still clean up.
    user_id: Option<Uuid>,
    poll_interval: Duration,
    notifier: Option<mpsc::UnboundedSender<SessionState>>,
}

impl<A: SessionApi> InvalidationDetector<A> {
    #[must_use]
    pub fn new(api: A, email: &str, device_id: &str, device_name: &str) -> Self {
        Self {
            api,
            email: email.to_string(),
            device_id: device_id.to_string(),
            device_name: device_name.to_string(),
            state: SessionState::Initial,
            user_id: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            notifier: None,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Publish every state change on `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: mpsc::UnboundedSender<SessionState>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Account id known from a previous run, used by `logout` before any
    /// resolve has happened.
    #[must_use]
    pub fn with_user_id(mut self, user_id: Option<Uuid>) -> Self {
        self.user_id = user_id;
        self
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    fn transition(&mut self, state: SessionState) {
        if let Some(user_id) = state.user_id() {
            self.user_id = Some(user_id);
        }
        if state != self.state {
            debug!(from = self.state.name(), to = state.name(), "session state changed");
            if let Some(notifier) = &self.notifier {
                // A dropped receiver only means nobody is listening anymore.
                let _ = notifier.send(state.clone());
            }
            self.state = state;
        }
    }

    fn invalid(&self, operation: &'static str) -> ClientError {
        ClientError::InvalidTransition {
            operation,
            state: self.state.name(),
        }
    }

    fn apply_login(&mut self, outcome: Outcome) -> Result<(), ClientError> {
        let next = match outcome {
            Outcome::Admitted { account, evicted } => {
                if let Some(evicted) = evicted {
                    info!(
                        evicted = %evicted.device_id,
                        name = %evicted.device_name,
                        "oldest device was signed out to make room"
                    );
                }
                SessionState::Active {
                    account,
                    profile_complete: true,
                }
            }
            Outcome::ProfileIncomplete { account } => SessionState::Active {
                account,
                profile_complete: false,
            },
            Outcome::LimitReached { user_id, devices } => {
                SessionState::LimitPending { user_id, devices }
            }
            Outcome::NotRecognized => return Err(ClientError::UnexpectedOutcome("notRecognized")),
        };
        self.transition(next);
        Ok(())
    }

    /// Interactive login. Allowed before the first login and after logout.
    ///
    /// # Errors
    /// Fails on an invalid transition or when the registry call fails; the
    /// state is left untouched in both cases.
    #[instrument(skip(self), fields(device_id = %self.device_id))]
    pub async fn login(&mut self) -> Result<&SessionState, ClientError> {
        if !matches!(self.state, SessionState::Initial | SessionState::LoggedOut) {
            return Err(self.invalid("log in"));
        }

        let outcome = self
            .api
            .resolve(
                &self.email,
                &self.device_id,
                &self.device_name,
                ResolveMode::Login,
            )
            .await?;
        self.apply_login(outcome)?;
        Ok(&self.state)
    }

    /// Remove `device_id` from a full account and retry the login.
    ///
    /// If another device grabbed the freed slot in the meantime the state
    /// stays `LimitPending` with the fresh device list.
    ///
    /// # Errors
    /// Fails outside `LimitPending` or when a registry call fails.
    #[instrument(skip(self))]
    pub async fn evict_and_retry(&mut self, device_id: &str) -> Result<&SessionState, ClientError> {
        let SessionState::LimitPending { user_id, .. } = self.state else {
            return Err(self.invalid("evict a device"));
        };

        self.api.remove_device(user_id, device_id).await?;
        info!(evicted = device_id, "device removed, retrying login");

        let outcome = self
            .api
            .resolve(
                &self.email,
                &self.device_id,
                &self.device_name,
                ResolveMode::Login,
            )
            .await?;
        self.apply_login(outcome)?;
        Ok(&self.state)
    }

    /// Store name and phone number for an active session.
    ///
    /// # Errors
    /// Fails outside `Active` or when the registry rejects the update.
    pub async fn complete_profile(
        &mut self,
        name: &str,
        phone_number: &str,
    ) -> Result<&SessionState, ClientError> {
        let SessionState::Active { ref account, .. } = self.state else {
            return Err(self.invalid("update the profile"));
        };
        let user_id = account.user_id;

        let account = self.api.update_profile(user_id, name, phone_number).await?;
        self.transition(SessionState::Active {
            account,
            profile_complete: true,
        });
        Ok(&self.state)
    }

    /// One periodic re-check.
    ///
    /// Transient registry errors keep the session `Active`; the next poll
    /// tries again.
    ///
    /// # Errors
    /// Fails outside `Active`, or on non-transient registry errors.
    #[instrument(skip(self), fields(device_id = %self.device_id))]
    pub async fn poll_once(&mut self) -> Result<&SessionState, ClientError> {
        if !matches!(self.state, SessionState::Active { .. }) {
            return Err(self.invalid("poll"));
        }

        let outcome = match self
            .api
            .resolve(
                &self.email,
                &self.device_id,
                &self.device_name,
                ResolveMode::Refresh,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(err) if err.is_transient() => {
                warn!("session check failed, keeping session: {err}");
                return Ok(&self.state);
            }
            Err(err) => return Err(err),
        };

        let next = match outcome {
            Outcome::Admitted { account, .. } => SessionState::Active {
                account,
                profile_complete: true,
            },
            Outcome::ProfileIncomplete { account } => SessionState::Active {
                account,
                profile_complete: false,
            },
            Outcome::NotRecognized => {
                warn!("this device was signed out from another device");
                SessionState::Evicted
            }
            // Refresh never refuses a known device; treat it like a stale
            // answer and keep the session.
            Outcome::LimitReached { .. } => {
                warn!("unexpected limit response to a session check");
                return Ok(&self.state);
            }
        };
        self.transition(next);
        Ok(&self.state)
    }

    /// The user saw the forced-logout notice.
    ///
    /// # Errors
    /// Fails outside `Evicted`.
    pub fn acknowledge_eviction(&mut self) -> Result<&SessionState, ClientError> {
        if self.state != SessionState::Evicted {
            return Err(self.invalid("acknowledge an eviction"));
        }
        self.transition(SessionState::LoggedOut);
        Ok(&self.state)
    }

    /// Sign this device out, freeing its slot when the account is known.
    ///
    /// The device is logged out locally even if the registry call fails.
    ///
    /// # Errors
    /// Returns the registry error after the local logout.
    #[instrument(skip(self), fields(device_id = %self.device_id))]
    pub async fn logout(&mut self) -> Result<&SessionState, ClientError> {
        let result = match (self.user_id, &self.state) {
            // An evicted device no longer holds a slot.
            (_, SessionState::Evicted | SessionState::LoggedOut) | (None, _) => Ok(()),
            (Some(user_id), _) => self.api.remove_device(user_id, &self.device_id).await,
        };

        self.transition(SessionState::LoggedOut);
        result.map(|()| &self.state)
    }

    /// Poll until the device is evicted or logged out, or until `shutdown`
    /// resolves.
    ///
    /// # Errors
    /// Fails when not `Active`, or on a non-transient registry error.
    pub async fn watch<F>(&mut self, shutdown: F) -> Result<&SessionState, ClientError>
    where
        F: Future<Output = ()> + Send,
    {
        if !matches!(self.state, SessionState::Active { .. }) {
            return Err(self.invalid("watch"));
        }

        tokio::pin!(shutdown);

        while !self.state.is_terminal() {
            let delay = jittered(self.poll_interval);
            tokio::select! {
                () = &mut shutdown => {
                    debug!("session watch cancelled");
                    break;
                }
                () = tokio::time::sleep(delay) => {
                    self.poll_once().await?;
                }
            }
        }

        Ok(&self.state)
    }
}

/// `interval` plus up to 10% random delay so many clients do not poll in
/// lockstep.
fn jittered(interval: Duration) -> Duration {
    let max_jitter = interval.as_secs_f64() * POLL_JITTER;
    if max_jitter <= 0.0 {
        return interval;
    }
    let jitter = rand::thread_rng().gen_range(0.0..max_jitter);
    interval + Duration::from_secs_f64(jitter)
}
