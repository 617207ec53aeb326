use std::collections::HashMap;

use crate::{heap::HeapTable, types::Pod, utils::HandyRwLock};

/// Maps table ids to the heap tables of the database.
pub struct Catalog {
    table_id_table_map: HashMap<u32, Pod<HeapTable>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            table_id_table_map: HashMap::new(),
        }
    }

    pub fn add_table(&mut self, table: Pod<HeapTable>) {
        let table_id = table.rl().get_id();
        self.table_id_table_map.insert(table_id, table);
    }

    pub fn get_table(&self, table_id: &u32) -> Option<Pod<HeapTable>> {
        self.table_id_table_map.get(table_id).cloned()
    }

    pub fn clear(&mut self) {
        self.table_id_table_map.clear();
    }
}
