use std::fmt::Debug;

use crate::{
    io::{read_exact, Decodeable, Encodeable},
    storage::schema::Type,
};

#[derive(Debug, Clone)]
pub enum Cell {
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Bytes(Vec<u8>),
}

impl Cell {
    pub fn read_from<R: std::io::Read>(reader: &mut R, t: &Type) -> Self {
        match t {
            Type::Bool => Cell::Bool(bool::read_from(reader)),
            Type::Int64 => Cell::Int64(i64::read_from(reader)),
            Type::Float64 => Cell::Float64(f64::read_from(reader)),
            Type::Bytes(capacity) => {
                let len = u8::read_from(reader);
                let payload = read_exact(reader, *capacity as usize);
                Cell::Bytes(payload[..len as usize].to_vec())
            }
        }
    }

    /// Serialize the cell into exactly `t.size()` bytes.
    pub fn to_bytes(&self, t: &Type) -> Vec<u8> {
        match (self, t) {
            (Cell::Bool(v), Type::Bool) => v.to_bytes(),
            (Cell::Int64(v), Type::Int64) => v.to_bytes(),
            (Cell::Float64(v), Type::Float64) => v.to_bytes(),
            (Cell::Bytes(v), Type::Bytes(capacity)) => {
                if v.len() > *capacity as usize {
                    panic!(
                        "bytes cell too large: {} > {}",
                        v.len(),
                        capacity
                    );
                }

                let mut buf = Vec::with_capacity(t.size());
                buf.push(v.len() as u8);
                buf.extend_from_slice(v);
                buf.resize(t.size(), 0);
                buf
            }
            _ => panic!("cell {:?} does not match type {:?}", self, t),
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Bool(a), Cell::Bool(b)) => a == b,
            (Cell::Int64(a), Cell::Int64(b)) => a == b,
            (Cell::Float64(a), Cell::Float64(b)) => a == b,
            (Cell::Bytes(a), Cell::Bytes(b)) => a == b,
            _ => panic!("comparing cells of different types"),
        }
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Cell::Bool(a), Cell::Bool(b)) => a.partial_cmp(b),
            (Cell::Int64(a), Cell::Int64(b)) => a.partial_cmp(b),
            (Cell::Float64(a), Cell::Float64(b)) => a.partial_cmp(b),
            (Cell::Bytes(a), Cell::Bytes(b)) => a.partial_cmp(b),
            _ => panic!("comparing cells of different types"),
        }
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).unwrap()
    }
}
