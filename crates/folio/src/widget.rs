//! Request slots that keep one fetch in flight per widget.
//!
//! A [`Widget`] owns the cancellation token of its current request. Starting
//! a new load cancels the previous token and bumps a generation counter; a
//! result is published only while its generation is still the latest, so a
//! slow response for an old selection can never overwrite a newer one.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use folio_core::{CancellationToken, DataError, Result, cancellable};
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

/// Observable state of a widget.
#[derive(Debug)]
pub enum WidgetState<T> {
    /// Nothing requested yet, or unmounted.
    Idle,
    /// A request for `key` is in flight.
    Loading {
        /// Selection being loaded.
        key: String,
    },
    /// The latest request succeeded.
    Ready {
        /// Selection the data belongs to.
        key: String,
        /// Loaded data, shared with every observer.
        data: Arc<T>,
    },
    /// The latest request failed; call [`Widget::load`] again to retry.
    Failed {
        /// Selection that failed.
        key: String,
        /// Display form of the error.
        error: String,
    },
}

impl<T> Clone for WidgetState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Loading { key } => Self::Loading { key: key.clone() },
            Self::Ready { key, data } => Self::Ready {
                key: key.clone(),
                data: Arc::clone(data),
            },
            Self::Failed { key, error } => Self::Failed {
                key: key.clone(),
                error: error.clone(),
            },
        }
    }
}

impl<T> WidgetState<T> {
    /// Selection the state refers to, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Loading { key } | Self::Ready { key, .. } | Self::Failed { key, .. } => {
                Some(key)
            }
        }
    }

    /// Loaded data, if the state is ready.
    #[must_use]
    pub fn data(&self) -> Option<&Arc<T>> {
        match self {
            Self::Ready { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Returns true while a request is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// Short name of the variant.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading { .. } => "loading",
            Self::Ready { .. } => "ready",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    token: CancellationToken,
}

/// A single-flight request slot with observable state.
pub struct Widget<T> {
    name: &'static str,
    slot: Mutex<Slot>,
    state: watch::Sender<WidgetState<T>>,
}

impl<T> fmt::Debug for Widget<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Widget")
            .field("name", &self.name)
            .field("state", &state.label())
            .field("key", &state.key())
            .finish()
    }
}

impl<T> Widget<T> {
    /// Create an idle widget.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        let (state, _) = watch::channel(WidgetState::Idle);
        Self {
            name,
            slot: Mutex::new(Slot {
                generation: 0,
                token: CancellationToken::new(),
            }),
            state,
        }
    }

    /// Returns the widget name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> WidgetState<T> {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WidgetState<T>> {
        self.state.subscribe()
    }

    /// Loads `key`, superseding any request still in flight.
    ///
    /// `fetch` receives the token of this request and should pass it to the
    /// source; the future is also raced against the token here, so a source
    /// that ignores it is still abandoned once superseded.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Cancelled`] if a newer load or
    /// [`unmount`](Self::unmount) took over before the fetch finished. In
    /// that case the result is not published. Any other error is published as
    /// [`WidgetState::Failed`] and returned.
    pub async fn load<F, Fut>(&self, key: impl Into<String>, fetch: F) -> Result<Arc<T>>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = key.into();
        let (generation, token) = {
            let mut slot = self.slot.lock().await;
            slot.token.cancel();
            slot.generation += 1;
            slot.token = CancellationToken::new();
            self.state
                .send_replace(WidgetState::Loading { key: key.clone() });
            (slot.generation, slot.token.clone())
        };
        debug!(widget = self.name, key = %key, generation, "Loading");

        let result = cancellable(&token, fetch(token.clone())).await;

        let slot = self.slot.lock().await;
        if slot.generation != generation {
            debug!(widget = self.name, key = %key, generation, "Discarding superseded result");
            return Err(DataError::Cancelled);
        }

        match result {
            Ok(data) => {
                let data = Arc::new(data);
                self.state.send_replace(WidgetState::Ready {
                    key,
                    data: Arc::clone(&data),
                });
                Ok(data)
            }
            Err(e) => {
                warn!(widget = self.name, key = %key, error = %e, "Load failed");
                self.state.send_replace(WidgetState::Failed {
                    key,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Cancels the request in flight and returns the widget to
    /// [`WidgetState::Idle`]. The cancelled request publishes nothing.
    pub async fn unmount(&self) {
        let mut slot = self.slot.lock().await;
        slot.token.cancel();
        slot.generation += 1;
        self.state.send_replace(WidgetState::Idle);
        debug!(widget = self.name, "Unmounted");
    }
}
