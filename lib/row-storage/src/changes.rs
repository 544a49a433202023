//! Table-level change notification.
//!
//! - `Changes`: set of tables touched by one logical operation
//! - `ChangeNotifier`: broadcast fan-out that executors embed to implement `notify`
//! - `ChangesReceiver`: observer side, filtered to a set of tables

use std::collections::BTreeSet;

use tokio::sync::broadcast;
use tracing::{trace, warn};

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Tables affected by one logical operation.
///
/// Equality is set equality, so insertion order never matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Changes {
    tables: BTreeSet<String>,
}

impl Changes {
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    /// Changes in exactly one table.
    pub fn table(table: impl Into<String>) -> Self {
        Self::new([table])
    }

    pub fn affected_tables(&self) -> &BTreeSet<String> {
        &self.tables
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains(table)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn union(&self, other: &Changes) -> Changes {
        Changes {
            tables: self.tables.union(&other.tables).cloned().collect(),
        }
    }

    /// In-place union.
    pub fn merge(&mut self, other: Changes) {
        self.tables.extend(other.tables);
    }

    pub fn intersects(&self, tables: &BTreeSet<String>) -> bool {
        !self.tables.is_disjoint(tables)
    }
}

impl<S: Into<String>> FromIterator<S> for Changes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Broadcasts [`Changes`] to every live [`ChangesReceiver`].
///
/// Sending never blocks and never fails: with no observers the changes are dropped.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<Changes>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Capacity bounds how far a slow observer may fall behind before it lags.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn notify(&self, changes: Changes) {
        trace!(tables = ?changes.affected_tables(), "notifying about changes");
        // Err only means there are no receivers right now.
        let _ = self.sender.send(changes);
    }

    /// Observe changes touching any of `tables`.
    pub fn subscribe<I, S>(&self, tables: I) -> ChangesReceiver
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ChangesReceiver {
            receiver: self.sender.subscribe(),
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer handle returned by [`ChangeNotifier::subscribe`].
#[derive(Debug)]
pub struct ChangesReceiver {
    receiver: broadcast::Receiver<Changes>,
    tables: BTreeSet<String>,
}

impl ChangesReceiver {
    /// Wait for the next [`Changes`] touching an observed table.
    ///
    /// Returns `None` once the notifier is gone. If this receiver fell behind and
    /// notifications were dropped, it yields `Changes` naming every observed table
    /// so the caller re-reads rather than missing an update.
    pub async fn recv(&mut self) -> Option<Changes> {
        loop {
            match self.receiver.recv().await {
                Ok(changes) if changes.intersects(&self.tables) => return Some(changes),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change observer lagged behind");
                    return Some(Changes {
                        tables: self.tables.clone(),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn observed_tables(&self) -> &BTreeSet<String> {
        &self.tables
    }
}

/// Executors that expose their change stream to observers.
pub trait ObserveChanges {
    fn observe_changes_in_tables<I, S>(&self, tables: I) -> ChangesReceiver
    where
        I: IntoIterator<Item = S>,
        S: Into<String>;

    fn observe_changes_in_table(&self, table: &str) -> ChangesReceiver {
        self.observe_changes_in_tables([table])
    }
}
