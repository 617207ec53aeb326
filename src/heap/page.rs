use std::sync::Arc;

use bit_vec::BitVec;

use crate::{
    buffer::BufferPool,
    error::DbError,
    heap::HeapPageID,
    storage::{Schema, Tuple, WrappedTuple},
    transaction::{PageLock, TransactionID},
};

/// A fixed-size page of a heap table.
///
/// Layout: a slot bitmap of `ceil(slot_count / 8)` bytes (1 = occupied,
/// LSB-first within each byte), followed by `slot_count` slots of exactly
/// `tuple_size` bytes each. Trailing bytes are zero.
#[derive(Debug)]
pub struct HeapPage {
    pid: HeapPageID,

    schema: Schema,

    slot_count: usize,

    // indicate slots' status: true means occupied, false means empty
    header: BitVec,

    // all slots (include empty ones)
    tuples: Vec<Tuple>,

    // the transaction that last wrote the page, None if the page is clean
    dirtier: Option<TransactionID>,

    lock: Arc<PageLock>,
}

impl HeapPage {
    pub fn new(pid: &HeapPageID, bytes: &[u8], schema: &Schema) -> Self {
        let slot_count = Self::calculate_slots_count(schema);
        let header_size = Self::calculate_header_size(slot_count);
        let header = Self::read_header(&bytes[..header_size], slot_count);

        let tuple_size = schema.get_size();
        let mut tuples = Vec::with_capacity(slot_count);
        for i in 0..slot_count {
            let start = header_size + i * tuple_size;
            let mut slot_bytes = &bytes[start..start + tuple_size];
            tuples.push(Tuple::read_from(&mut slot_bytes, schema));
        }

        Self {
            pid: *pid,
            schema: schema.clone(),
            slot_count,
            header,
            tuples,
            dirtier: None,
            lock: PageLock::new(*pid),
        }
    }

    pub fn empty_page_data() -> Vec<u8> {
        vec![0; BufferPool::get_page_size()]
    }

    /// Retrieve the maximum number of tuples this page can hold.
    pub fn calculate_slots_count(schema: &Schema) -> usize {
        let bits_per_tuple_including_header = schema.get_size() * 8 + 1;
        BufferPool::get_page_size() * 8 / bits_per_tuple_including_header
    }

    /// Number of bytes taken by the slot bitmap.
    pub fn calculate_header_size(slot_count: usize) -> usize {
        (slot_count + 7) / 8
    }

    fn read_header(bytes: &[u8], slot_count: usize) -> BitVec {
        let mut header = BitVec::from_elem(slot_count, false);
        for i in 0..slot_count {
            if (bytes[i / 8] >> (i % 8)) & 1 == 1 {
                header.set(i, true);
            }
        }
        header
    }

    fn header_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; Self::calculate_header_size(self.slot_count)];
        for i in 0..self.slot_count {
            if self.header[i] {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }
        bytes
    }

    /// Serialize the page back into exactly `page_size` bytes.
    pub fn get_page_data(&self) -> Vec<u8> {
        let tuple_size = self.schema.get_size();
        let mut data = self.header_bytes();

        for i in 0..self.slot_count {
            if self.is_slot_used(i) {
                data.extend_from_slice(&self.tuples[i].to_bytes(&self.schema));
            } else {
                data.extend_from_slice(&vec![0; tuple_size]);
            }
        }

        data.resize(BufferPool::get_page_size(), 0);
        data
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    pub fn get_pg_lock(&self) -> Arc<PageLock> {
        Arc::clone(&self.lock)
    }

    pub fn is_dirty(&self) -> Option<TransactionID> {
        self.dirtier
    }

    pub fn mark_dirty(&mut self, dirtier: Option<TransactionID>) {
        self.dirtier = dirtier;
    }

    pub fn get_slots_count(&self) -> usize {
        self.slot_count
    }

    pub fn empty_slots_count(&self) -> usize {
        (0..self.slot_count)
            .filter(|i| !self.is_slot_used(*i))
            .count()
    }

    /// Returns the number of tuples currently stored on this page.
    pub fn tuples_count(&self) -> usize {
        self.slot_count - self.empty_slots_count()
    }

    pub fn is_slot_used(&self, slot_index: usize) -> bool {
        self.header[slot_index]
    }

    fn mark_slot_status(&mut self, slot_index: usize, used: bool) {
        self.header.set(slot_index, used);
    }

    /// Place the tuple in the first empty slot, returns the slot index.
    pub fn insert_tuple(&mut self, tuple: &Tuple) -> Result<usize, DbError> {
        for i in 0..self.slot_count {
            if !self.is_slot_used(i) {
                self.tuples[i] = tuple.clone();
                self.mark_slot_status(i, true);
                return Ok(i);
            }
        }

        Err(DbError::new(&format!("page {} is full", self.pid)))
    }

    pub fn delete_tuple(&mut self, slot_index: usize) -> Result<(), DbError> {
        assert!(
            slot_index < self.slot_count,
            "slot index {} out of range (slot count: {})",
            slot_index,
            self.slot_count
        );

        if !self.is_slot_used(slot_index) {
            return Err(DbError::new(&format!(
                "slot {} of page {} is already empty",
                slot_index, self.pid
            )));
        }

        self.mark_slot_status(slot_index, false);
        Ok(())
    }

    pub fn get_tuple(&self, slot_index: usize) -> Option<Tuple> {
        if self.is_slot_used(slot_index) {
            return Some(self.tuples[slot_index].clone());
        }
        None
    }

    /// Snapshot of all occupied slots, in slot order.
    pub fn tuples(&self) -> Vec<WrappedTuple> {
        (0..self.slot_count)
            .filter(|i| self.is_slot_used(*i))
            .map(|i| WrappedTuple::new(self.tuples[i].clone(), i, self.pid))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::small_int_schema;

    fn empty_page(schema: &Schema) -> HeapPage {
        let pid = HeapPageID::new(0, 0);
        HeapPage::new(&pid, &HeapPage::empty_page_data(), schema)
    }

    #[test]
    fn test_slots_count() {
        // 4096 * 8 bits / (8 bytes * 8 bits + 1 header bit)
        let schema = small_int_schema(1, "t");
        assert_eq!(HeapPage::calculate_slots_count(&schema), 504);
        assert_eq!(HeapPage::calculate_header_size(504), 63);
    }

    #[test]
    fn test_header_is_lsb_first() {
        let schema = small_int_schema(2, "t");
        let mut page = empty_page(&schema);

        for _ in 0..9 {
            page.insert_tuple(&Tuple::new_int_tuples(3, 2)).unwrap();
        }

        let data = page.get_page_data();
        assert_eq!(data[0], 0xff);
        assert_eq!(data[1], 0x01);
    }

    #[test]
    fn test_insert_delete_round_trip() {
        let schema = small_int_schema(2, "t");
        let mut page = empty_page(&schema);

        let tuple = Tuple::new_int_tuples(17, 2);
        let slot = page.insert_tuple(&tuple).unwrap();
        assert_eq!(page.tuples_count(), 1);

        // survives a serialization round trip
        let reborn = HeapPage::new(&page.get_pid(), &page.get_page_data(), &schema);
        assert_eq!(reborn.get_tuple(slot), Some(tuple));

        page.delete_tuple(slot).unwrap();
        assert_eq!(page.tuples_count(), 0);
        assert!(page.delete_tuple(slot).is_err());
    }

    #[test]
    fn test_page_fills_up() {
        let schema = small_int_schema(1, "t");
        let mut page = empty_page(&schema);

        let capacity = page.get_slots_count();
        for _ in 0..capacity {
            page.insert_tuple(&Tuple::new_int_tuples(1, 1)).unwrap();
        }
        assert!(page.insert_tuple(&Tuple::new_int_tuples(1, 1)).is_err());
    }
}
