//! Atomically swappable table snapshot.
//!
//! Readers take an `Arc` to the current snapshot and match against it
//! without locks; a reload publishes a whole new table with one pointer swap.

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::routing::table::MatchTable;

/// A published table and its version.
#[derive(Debug)]
pub struct TableSnapshot {
    version: u64,
    table: Arc<MatchTable>,
}

impl TableSnapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn table(&self) -> &MatchTable {
        &self.table
    }
}

impl std::ops::Deref for TableSnapshot {
    type Target = MatchTable;

    fn deref(&self) -> &MatchTable {
        &self.table
    }
}

/// Holder of the current [`MatchTable`].
#[derive(Debug)]
pub struct RouteStore {
    current: ArcSwap<TableSnapshot>,
}

impl RouteStore {
    /// Start at version 1 with `table`.
    pub fn new(table: MatchTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(TableSnapshot {
                version: 1,
                table: Arc::new(table),
            }),
        }
    }

    /// The table requests should be matched against right now.
    pub fn snapshot(&self) -> Arc<TableSnapshot> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    /// Replace the current table. Returns the new version.
    pub fn publish(&self, table: MatchTable) -> u64 {
        let table = Arc::new(table);
        let previous = self.current.rcu(|old| TableSnapshot {
            version: old.version + 1,
            table: Arc::clone(&table),
        });
        previous.version + 1
    }
}

impl Default for RouteStore {
    fn default() -> Self {
        Self::new(MatchTable::empty())
    }
}
