/*!
 * Cancellation for blocking sends.
 *
 * A `CancelToken` is handed to a send call; any clone of it may be
 * cancelled from any thread. Cancelling drops the sending half of a
 * crossbeam channel, which wakes every receiver at once, so a send blocked
 * in `select!` returns immediately instead of waiting for a socket timeout.
 *
 * `InFlight` is the single slot `ReportTransport` uses to remember the
 * token of the POST currently on the wire, for `abort()`.
 */
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

struct Inner {
    cancelled: AtomicBool,

    /// Dropped on cancel. Never sent on.
    trigger: Mutex<Option<Sender<()>>>,

    /// Disconnects once `trigger` is dropped.
    signal: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /**
     * Cancels the token. Idempotent; only the first call has any effect.
     *
     * Returns `true` if this call performed the cancellation.
     */
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }

        if let Ok(mut trigger) = self.inner.trigger.lock() {
            trigger.take();
        }
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /**
     * Receiver that becomes ready (disconnected) once the token is
     * cancelled. Intended for `crossbeam_channel::select!`.
     */
    pub fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }

    pub(crate) fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// InFlight
// ---------------------------------------------------------------------------

/**
 * Holds at most one token: the one belonging to the request currently in
 * flight. Registering a new request replaces the previous handle.
 */
#[derive(Default)]
pub(crate) struct InFlight {
    slot: Mutex<Option<CancelToken>>,
}

impl InFlight {
    pub(crate) fn register(&self, token: &CancelToken) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(token.clone());
        }
    }

    /// Clears the slot, but only if `token` still owns it.
    pub(crate) fn release(&self, token: &CancelToken) {
        if let Ok(mut slot) = self.slot.lock() {
            if slot.as_ref().is_some_and(|current| current.same_as(token)) {
                *slot = None;
            }
        }
    }

    /**
     * Cancels and forgets the tracked request, if any.
     *
     * Returns `false` when nothing was in flight.
     */
    pub(crate) fn cancel(&self) -> bool {
        let current = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };

        match current {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}
