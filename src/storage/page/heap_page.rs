use std::sync::Arc;

use crate::common::{DbError, PageId, RecordId, Result, SlotId, TransactionId};
use crate::tuple::{Schema, Tuple};

/// A heap page holds fixed-width tuples of a single schema.
///
/// Page layout:
///
/// ```text
/// +----------------+--------+--------+-----+-------------+---------+
/// | Slot Bitmap    | Slot 0 | Slot 1 | ... | Slot N - 1  | Padding |
/// | ceil(N/8) B    | t B    | t B    |     | t B         | zeros   |
/// +----------------+--------+--------+-----+-------------+---------+
/// ```
///
/// With `t` the schema's tuple size and `P` the page size, the page has
/// `N = floor(P * 8 / (t * 8 + 1))` slots: every slot costs its tuple bytes
/// plus one header bit. Bit `i % 8` of bitmap byte `i / 8` is set when slot
/// `i` holds a tuple.
///
/// The page also tracks its dirty owner. A page is clean (`None`) or dirty
/// on behalf of exactly one transaction.
#[derive(Debug, Clone)]
pub struct HeapPage {
    page_id: PageId,
    schema: Arc<Schema>,
    num_slots: usize,
    header_len: usize,
    data: Vec<u8>,
    dirtier: Option<TransactionId>,
}

impl HeapPage {
    /// Largest slot count a page may have; every slot number fits a `SlotId`.
    pub const MAX_SLOTS: usize = u16::MAX as usize + 1;

    /// Builds a page from its on-disk image. The page size is `data.len()`.
    pub fn new(page_id: PageId, data: Vec<u8>, schema: Arc<Schema>) -> Result<Self> {
        let num_slots = Self::slots_per_page(data.len(), schema.tuple_size());
        if num_slots == 0 {
            return Err(DbError::CorruptPage {
                page_id,
                reason: format!(
                    "{} byte page cannot hold a {} byte tuple",
                    data.len(),
                    schema.tuple_size()
                ),
            });
        }
        if num_slots > Self::MAX_SLOTS {
            return Err(DbError::CorruptPage {
                page_id,
                reason: format!(
                    "{} slots exceed the limit of {}",
                    num_slots,
                    Self::MAX_SLOTS
                ),
            });
        }
        let header_len = Self::header_len(num_slots);

        Ok(Self {
            page_id,
            schema,
            num_slots,
            header_len,
            data,
            dirtier: None,
        })
    }

    /// Number of tuple slots that fit in a page.
    pub fn slots_per_page(page_size: usize, tuple_size: usize) -> usize {
        (page_size * 8) / (tuple_size * 8 + 1)
    }

    fn header_len(num_slots: usize) -> usize {
        (num_slots + 7) / 8
    }

    /// The canonical image of a page with no tuples.
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Returns the serialized page.
    pub fn page_data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        if slot >= self.num_slots {
            return false;
        }
        self.data[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot(&mut self, slot: usize, used: bool) {
        let mask = 1u8 << (slot % 8);
        if used {
            self.data[slot / 8] |= mask;
        } else {
            self.data[slot / 8] &= !mask;
        }
    }

    fn slot_range(&self, slot: usize) -> std::ops::Range<usize> {
        let tuple_size = self.schema.tuple_size();
        let start = self.header_len + slot * tuple_size;
        start..start + tuple_size
    }

    pub fn num_empty_slots(&self) -> usize {
        (0..self.num_slots)
            .filter(|&slot| !self.is_slot_used(slot))
            .count()
    }

    pub fn has_free_slot(&self) -> bool {
        (0..self.num_slots).any(|slot| !self.is_slot_used(slot))
    }

    /// Stores `tuple` in the first empty slot and records its new location.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<SlotId> {
        if !tuple.schema().same_layout(&self.schema) {
            return Err(DbError::SchemaMismatch(format!(
                "tuple schema does not match the schema of {}",
                self.page_id
            )));
        }
        let slot = (0..self.num_slots)
            .find(|&slot| !self.is_slot_used(slot))
            .ok_or(DbError::PageFull)?;

        let range = self.slot_range(slot);
        tuple.write_to(&mut self.data[range])?;
        self.set_slot(slot, true);

        let slot_id = SlotId::new(slot as u16);
        tuple.set_record_id(Some(RecordId::new(self.page_id, slot_id)));
        Ok(slot_id)
    }

    /// Clears the slot `tuple` was stored in.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let record_id = tuple.record_id().ok_or(DbError::MissingRecordId)?;
        if record_id.page_id != self.page_id {
            return Err(DbError::RecordNotOnPage {
                record_id,
                page_id: self.page_id,
            });
        }
        let slot = record_id.slot_id.as_usize();
        if slot >= self.num_slots {
            return Err(DbError::InvalidSlotId(slot));
        }
        if !self.is_slot_used(slot) {
            return Err(DbError::EmptySlot(slot));
        }

        self.set_slot(slot, false);
        let range = self.slot_range(slot);
        self.data[range].fill(0);
        Ok(())
    }

    /// Reads the tuple in `slot`, or `None` when the slot is empty.
    pub fn tuple(&self, slot: usize) -> Result<Option<Tuple>> {
        if slot >= self.num_slots {
            return Err(DbError::InvalidSlotId(slot));
        }
        if !self.is_slot_used(slot) {
            return Ok(None);
        }
        let mut tuple = Tuple::from_bytes(self.schema.clone(), &self.data[self.slot_range(slot)])?;
        tuple.set_record_id(Some(RecordId::new(
            self.page_id,
            SlotId::new(slot as u16),
        )));
        Ok(Some(tuple))
    }

    /// All stored tuples in slot order.
    pub fn tuples(&self) -> Result<Vec<Tuple>> {
        let mut tuples = Vec::with_capacity(self.num_slots - self.num_empty_slots());
        for slot in 0..self.num_slots {
            if let Some(tuple) = self.tuple(slot)? {
                tuples.push(tuple);
            }
        }
        Ok(tuples)
    }

    /// Returns the transaction that last dirtied this page, if it is dirty.
    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtier.is_some()
    }

    pub fn mark_dirty(&mut self, dirtier: Option<TransactionId>) {
        self.dirtier = dirtier;
    }
}
