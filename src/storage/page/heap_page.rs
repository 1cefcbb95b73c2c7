//! Slotted heap page.
//!
//! Every page of a heap file is a fixed-size byte block laid out as a slot
//! bitmap followed by densely packed fixed-width tuple slots:
//!
//! ```text
//! ┌──────────────────┬──────────┬──────────┬─────┬────────────┬─────────┐
//! │ header bitmap    │ slot 0   │ slot 1   │ ... │ slot N-1   │ padding │
//! │ ceil(N/8) bytes  │          │          │     │            │         │
//! └──────────────────┴──────────┴──────────┴─────┴────────────┴─────────┘
//! ```
//!
//! Bit `i` of the bitmap (byte `i / 8`, bit `i % 8`, LSB first) records
//! whether slot `i` holds a live tuple. The slot count is the largest `N`
//! with `N * (tuple_size * 8 + 1) <= page_size * 8`. Unused slots serialize
//! as zero bytes, so a freshly zeroed buffer parses as an empty page.

use std::sync::Arc;

use log::trace;

use crate::catalog::schema::Schema;
use crate::common::config::TxnId;
use crate::common::exception::DbError;
use crate::common::rid::RecordId;
use crate::storage::page::heap_page_id::HeapPageId;
use crate::storage::table::tuple::Tuple;

/// An in-memory page image: parsed slots plus the bookkeeping the buffer
/// pool needs (dirty flag, dirtying transaction, before-image snapshot).
#[derive(Debug, Clone)]
pub struct HeapPage {
    pid: HeapPageId,
    schema: Arc<Schema>,
    page_size: usize,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    dirty: Option<TxnId>,
    before_image: Vec<u8>,
}

impl HeapPage {
    /// Parses a page from a buffer of exactly `page_size` bytes.
    ///
    /// The tuple width of `schema` must fit the page at least once.
    pub fn new(pid: HeapPageId, data: &[u8], schema: Arc<Schema>) -> Result<Self, DbError> {
        let page_size = data.len();
        let num_slots = Self::slots_for(page_size, schema.byte_size());
        if num_slots == 0 {
            return Err(DbError::IllegalArgument(format!(
                "tuple size {} does not fit a {} byte page",
                schema.byte_size(),
                page_size
            )));
        }
        let header_size = num_slots.div_ceil(8);
        let header = data[..header_size].to_vec();

        let tuple_size = schema.byte_size();
        let mut tuples = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            let used = header[slot / 8] & (1 << (slot % 8)) != 0;
            if used {
                let offset = header_size + slot * tuple_size;
                let mut tuple = Tuple::deserialize_from(&data[offset..], schema.clone());
                tuple.set_record_id(Some(RecordId::new(pid, slot)));
                tuples.push(Some(tuple));
            } else {
                tuples.push(None);
            }
        }

        Ok(Self {
            pid,
            schema,
            page_size,
            header,
            tuples,
            dirty: None,
            before_image: data.to_vec(),
        })
    }

    /// Number of tuple slots a page of `page_size` bytes can hold, counting
    /// one header bit per slot.
    pub fn slots_for(page_size: usize, tuple_size: usize) -> usize {
        (page_size * 8) / (tuple_size * 8 + 1)
    }

    /// A zeroed buffer that parses as an empty page.
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0; page_size]
    }

    pub fn get_id(&self) -> HeapPageId {
        self.pid
    }

    pub fn get_schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn get_num_slots(&self) -> usize {
        self.tuples.len()
    }

    pub fn get_num_empty_slots(&self) -> usize {
        (0..self.get_num_slots())
            .filter(|&i| !self.is_slot_used(i))
            .count()
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        self.header[slot / 8] & (1 << (slot % 8)) != 0
    }

    pub fn mark_slot_used(&mut self, slot: usize, used: bool) {
        if used {
            self.header[slot / 8] |= 1 << (slot % 8);
        } else {
            self.header[slot / 8] &= !(1 << (slot % 8));
        }
    }

    /// Stores `tuple` in the first free slot and stamps its record id.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<(), DbError> {
        if tuple.get_schema().as_ref() != self.schema.as_ref() {
            return Err(DbError::SchemaMismatch);
        }
        let slot = (0..self.get_num_slots())
            .find(|&i| !self.is_slot_used(i))
            .ok_or(DbError::NoSpace(self.pid))?;

        tuple.set_record_id(Some(RecordId::new(self.pid, slot)));
        self.tuples[slot] = Some(tuple.clone());
        self.mark_slot_used(slot, true);
        trace!("inserted tuple into {} slot {}", self.pid, slot);
        Ok(())
    }

    /// Clears the slot named by the tuple's record id.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<(), DbError> {
        let rid = tuple.get_record_id().ok_or(DbError::MissingRecordId)?;
        if rid.get_page_id() != self.pid {
            return Err(DbError::NotOnPage(self.pid));
        }
        let slot = rid.get_slot();
        if slot >= self.get_num_slots() || !self.is_slot_used(slot) {
            return Err(DbError::SlotEmpty {
                pid: self.pid,
                slot,
            });
        }
        self.tuples[slot] = None;
        self.mark_slot_used(slot, false);
        trace!("deleted tuple from {} slot {}", self.pid, slot);
        Ok(())
    }

    /// Live tuples in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter().flatten()
    }

    /// Serializes the page back to its `page_size`-byte wire form.
    ///
    /// Parsing the result yields an equal page with the dirty flag cleared.
    pub fn get_page_data(&self) -> Vec<u8> {
        let mut data = vec![0u8; self.page_size];
        let header_size = self.header.len();
        data[..header_size].copy_from_slice(&self.header);

        let tuple_size = self.schema.byte_size();
        for (slot, tuple) in self.tuples.iter().enumerate() {
            if let Some(tuple) = tuple {
                let offset = header_size + slot * tuple_size;
                tuple.serialize_to(&mut data[offset..offset + tuple_size]);
            }
        }
        data
    }

    pub fn mark_dirty(&mut self, dirty: bool, tid: TxnId) {
        self.dirty = if dirty { Some(tid) } else { None };
    }

    /// The transaction that last dirtied this page, if it is dirty.
    pub fn is_dirty(&self) -> Option<TxnId> {
        self.dirty
    }

    /// The page bytes as of the last commit (or initial load), the undo
    /// side of a log record.
    pub fn get_before_image(&self) -> Vec<u8> {
        self.before_image.clone()
    }

    /// Snapshots the current bytes as the new before-image.
    pub fn set_before_image(&mut self) {
        self.before_image = self.get_page_data();
    }
}

impl PartialEq for HeapPage {
    fn eq(&self, other: &Self) -> bool {
        self.pid == other.pid && self.get_page_data() == other.get_page_data()
    }
}
