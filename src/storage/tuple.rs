use std::fmt;

use crate::{
    heap::HeapPageID,
    storage::{cell::Cell, schema::Schema},
};

#[derive(Clone)]
pub struct Tuple {
    cells: Vec<Cell>,
}

impl Tuple {
    pub fn new_from_cells(cells: &[Cell]) -> Self {
        Self {
            cells: cells.to_vec(),
        }
    }

    pub fn read_from<R: std::io::Read>(reader: &mut R, schema: &Schema) -> Self {
        let mut cells: Vec<Cell> = Vec::new();
        for field in &schema.fields {
            cells.push(Cell::read_from(reader, &field.field_type));
        }
        Tuple { cells }
    }

    /// Serialize the tuple into exactly `schema.get_size()` bytes.
    pub fn to_bytes(&self, schema: &Schema) -> Vec<u8> {
        assert_eq!(self.cells.len(), schema.fields.len());

        let mut bytes = Vec::with_capacity(schema.get_size());
        for (cell, field) in self.cells.iter().zip(&schema.fields) {
            bytes.extend_from_slice(&cell.to_bytes(&field.field_type));
        }
        bytes
    }

    pub fn new_int_tuples(value: i64, width: usize) -> Self {
        let cells = vec![Cell::Int64(value); width];
        Tuple { cells }
    }

    pub fn get_cell(&self, i: usize) -> Cell {
        self.cells[i].clone()
    }

    pub fn get_cells(&self) -> Vec<Cell> {
        self.cells.clone()
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.cells.len() == other.cells.len()
            && self.cells.iter().zip(&other.cells).all(|(a, b)| a == b)
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut content: String = "{".to_owned();
        for cell in &self.cells {
            content.push_str(&format!("{:?}, ", cell));
        }
        content = content.trim_end_matches(", ").to_string();
        content.push('}');
        write!(f, "{}", content)
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A tuple together with its storage position, used by operators that
/// have to address the slot it came from.
#[derive(Clone, PartialEq)]
pub struct WrappedTuple {
    internal: Tuple,
    slot_index: usize,
    pid: HeapPageID,
}

impl std::ops::Deref for WrappedTuple {
    type Target = Tuple;
    fn deref(&self) -> &Self::Target {
        &self.internal
    }
}

impl std::ops::DerefMut for WrappedTuple {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.internal
    }
}

impl WrappedTuple {
    pub fn new(internal: Tuple, slot_index: usize, pid: HeapPageID) -> WrappedTuple {
        WrappedTuple {
            internal,
            slot_index,
            pid,
        }
    }

    pub fn get_slot_index(&self) -> usize {
        self.slot_index
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }
}

impl Eq for WrappedTuple {}

impl fmt::Display for WrappedTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}[{}]", self.internal, self.pid, self.slot_index)
    }
}

impl fmt::Debug for WrappedTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
