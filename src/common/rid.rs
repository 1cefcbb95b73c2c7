use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::page::heap_page_id::HeapPageId;

/// Record ID - identifies a tuple's physical location in a table.
///
/// A record id pairs the page holding the tuple with the slot index inside
/// that page's slot directory. It stays valid as long as the tuple is not
/// deleted or moved.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RecordId {
    /// The page holding the tuple.
    pid: HeapPageId,
    /// The slot index within the page's slot directory.
    slot: usize,
}

impl RecordId {
    pub const fn new(pid: HeapPageId, slot: usize) -> Self {
        Self { pid, slot }
    }

    /// Returns the id of the page holding the tuple.
    pub const fn get_page_id(&self) -> HeapPageId {
        self.pid
    }

    /// Returns the slot index within the page.
    pub const fn get_slot(&self) -> usize {
        self.slot
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} slot {}", self.pid, self.slot)
    }
}
