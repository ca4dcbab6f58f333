//! Latest authoritative world snapshot and its listeners

use log::trace;
use shared::WorldSnapshot;
use std::sync::Arc;

type Listener = Box<dyn FnMut(Arc<WorldSnapshot>)>;

/// Handle returned by [`WorldStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Holds exactly one snapshot (none before the first update).
///
/// Each replace swaps in a new immutable `Arc`, so a listener can never see a
/// mix of old and new state. No interpolation or smoothing happens here.
#[derive(Default)]
pub struct WorldStore {
    current: Option<Arc<WorldSnapshot>>,
    listeners: Vec<(Subscription, Listener)>,
    next_subscription: u64,
}

impl WorldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<WorldSnapshot>> {
        self.current.clone()
    }

    pub fn player_count(&self) -> usize {
        self.current.as_ref().map_or(0, |s| s.players.len())
    }

    pub fn replace(&mut self, snapshot: WorldSnapshot) {
        let snapshot = Arc::new(snapshot);
        self.current = Some(Arc::clone(&snapshot));

        trace!(
            "World replaced: {} players, {} listeners",
            snapshot.players.len(),
            self.listeners.len()
        );

        for (_, listener) in &mut self.listeners {
            listener(Arc::clone(&snapshot));
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(Arc<WorldSnapshot>) + 'static,
    {
        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((subscription, Box::new(listener)));
        subscription
    }

    /// Returns false if the handle was already removed.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(s, _)| *s != subscription);
        self.listeners.len() != before
    }
}

impl std::fmt::Debug for WorldStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldStore")
            .field("current", &self.current)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
