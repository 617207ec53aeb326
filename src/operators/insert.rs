use crate::{
    error::DbError,
    storage::{Cell, Tuple},
    transaction::Transaction,
    Database,
};

/// Drains the child on first pull, inserting every tuple into the
/// table, then yields exactly one tuple holding the insertion count.
pub struct Insert<I> {
    tx: Transaction,
    table_id: u32,
    child: Option<I>,
    error: Option<DbError>,
}

impl<I> Insert<I> {
    pub fn new(tx: &Transaction, table_id: u32, child: I) -> Self {
        Self {
            tx: tx.clone(),
            table_id,
            child: Some(child),
            error: None,
        }
    }

    pub fn error(&self) -> Option<&DbError> {
        self.error.as_ref()
    }
}

impl<I: Iterator<Item = Tuple>> Iterator for Insert<I> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        let child = self.child.take()?;

        let mut count: i64 = 0;
        for tuple in child {
            match Database::buffer_pool().insert_tuple(&self.tx, self.table_id, &tuple) {
                Ok(()) => count += 1,
                Err(e) => {
                    self.error = Some(e);
                    break;
                }
            }
        }

        Some(Tuple::new_from_cells(&[Cell::Int64(count)]))
    }
}
