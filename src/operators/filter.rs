use crate::{predicate::Predicate, storage::WrappedTuple};

/// Yields the child's tuples that satisfy the predicate.
pub struct Filter<I> {
    predicate: Predicate,
    child: I,
}

impl<I> Filter<I> {
    pub fn new(predicate: Predicate, child: I) -> Self {
        Self { predicate, child }
    }
}

impl<I: Iterator<Item = WrappedTuple>> Iterator for Filter<I> {
    type Item = WrappedTuple;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(tuple) = self.child.next() {
            if self.predicate.matches(&tuple.get_cell(self.predicate.field_index)) {
                return Some(tuple);
            }
        }
        None
    }
}
