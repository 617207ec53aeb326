use crate::{
    error::DbError,
    storage::{Cell, Tuple, WrappedTuple},
    transaction::Transaction,
    Database,
};

/// Drains the child on first pull, deleting every tuple it yields,
/// then yields exactly one tuple holding the deletion count.
pub struct Delete<I> {
    tx: Transaction,
    child: Option<I>,
    error: Option<DbError>,
}

impl<I> Delete<I> {
    pub fn new(tx: &Transaction, child: I) -> Self {
        Self {
            tx: tx.clone(),
            child: Some(child),
            error: None,
        }
    }

    pub fn error(&self) -> Option<&DbError> {
        self.error.as_ref()
    }
}

impl<I: Iterator<Item = WrappedTuple>> Iterator for Delete<I> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        let child = self.child.take()?;

        let mut count: i64 = 0;
        for tuple in child {
            match Database::buffer_pool().delete_tuple(&self.tx, &tuple) {
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
