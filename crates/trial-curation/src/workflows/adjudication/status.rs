use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

/// How long a finished request keeps its success/failure indicator before
/// falling back to idle.
pub const STATUS_RESET_DELAY: Duration = Duration::from_secs(3);

/// Transient request indicator attached to one adjudication row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Idle,
    Sending,
    Succeeded,
    Failed,
}

#[derive(Debug)]
struct Flash {
    state: RequestState,
    error: Option<String>,
    /// Bumped on every state change; a scheduled reset only applies while
    /// its generation is still current, so a stale reset can never clobber
    /// a newer request.
    generation: u64,
}

/// Per-row flash state with an owned reset timer. The timer is aborted
/// before any restart and on drop, so a torn-down row cannot receive a late
/// update.
#[derive(Debug)]
pub struct RequestTracker {
    flash: Arc<Mutex<Flash>>,
    reset: Option<JoinHandle<()>>,
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            flash: Arc::new(Mutex::new(Flash {
                state: RequestState::Idle,
                error: None,
                generation: 0,
            })),
            reset: None,
        }
    }

    pub fn state(&self) -> RequestState {
        self.flash.lock().expect("flash mutex poisoned").state
    }

    pub fn error(&self) -> Option<String> {
        self.flash
            .lock()
            .expect("flash mutex poisoned")
            .error
            .clone()
    }

    pub fn is_sending(&self) -> bool {
        self.state() == RequestState::Sending
    }

    /// Mark a request as started. Clears any prior error and pending reset.
    pub fn begin(&mut self) {
        self.set(RequestState::Sending, None, false);
    }

    /// Mark the in-flight request as succeeded and schedule the fallback to
    /// idle.
    pub fn succeed(&mut self) {
        self.set(RequestState::Succeeded, None, true);
    }

    /// Mark the in-flight request as failed with a message. The indicator
    /// falls back to idle, the message stays until the next request starts.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.set(RequestState::Failed, Some(message.into()), true);
    }

    fn set(&mut self, state: RequestState, error: Option<String>, schedule_reset: bool) {
        if let Some(handle) = self.reset.take() {
            handle.abort();
        }

        let generation = {
            let mut flash = self.flash.lock().expect("flash mutex poisoned");
            flash.generation += 1;
            flash.state = state;
            if state == RequestState::Sending {
                // A fresh request wipes the previous failure message.
                flash.error = None;
            } else if error.is_some() {
                flash.error = error;
            }
            flash.generation
        };

        if schedule_reset {
            let flash = Arc::clone(&self.flash);
            self.reset = Some(tokio::spawn(async move {
                tokio::time::sleep(STATUS_RESET_DELAY).await;
                let mut flash = flash.lock().expect("flash mutex poisoned");
                if flash.generation == generation {
                    flash.state = RequestState::Idle;
                }
            }));
        }
    }
}

impl Drop for RequestTracker {
    fn drop(&mut self) {
        if let Some(handle) = self.reset.take() {
            handle.abort();
        }
    }
}
