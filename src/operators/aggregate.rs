use std::collections::BTreeMap;

use crate::storage::{Cell, Schema, Tuple, Type, WrappedTuple};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

/// Capability shared by the concrete aggregators. The right variant is
/// picked by field type when the operator is built.
pub trait Aggregator {
    fn merge(&mut self, tuple: &Tuple);
    fn results(&self) -> Vec<Tuple>;
}

#[derive(Default)]
struct IntGroupState {
    count: i64,
    sum: i64,
    min: Option<i64>,
    max: Option<i64>,
}

/// Aggregates an `Int64` field, optionally grouped by another field.
pub struct IntAggregator {
    agg_field: usize,
    group_by: Option<usize>,
    op: AggregateOp,
    groups: BTreeMap<Option<Cell>, IntGroupState>,
}

impl IntAggregator {
    pub fn new(agg_field: usize, group_by: Option<usize>, op: AggregateOp) -> Self {
        Self {
            agg_field,
            group_by,
            op,
            groups: BTreeMap::new(),
        }
    }
}

impl Aggregator for IntAggregator {
    fn merge(&mut self, tuple: &Tuple) {
        let value = match tuple.get_cell(self.agg_field) {
            Cell::Int64(v) => v,
            cell => panic!("integer aggregator fed with {:?}", cell),
        };

        let key = self.group_by.map(|i| tuple.get_cell(i));
        let state = self.groups.entry(key).or_insert_with(IntGroupState::default);
        state.count += 1;
        state.sum += value;
        state.min = Some(state.min.map_or(value, |m| m.min(value)));
        state.max = Some(state.max.map_or(value, |m| m.max(value)));
    }

    fn results(&self) -> Vec<Tuple> {
        self.groups
            .iter()
            .map(|(key, state)| {
                let value = match self.op {
                    AggregateOp::Count => Cell::Int64(state.count),
                    AggregateOp::Sum => Cell::Int64(state.sum),
                    AggregateOp::Avg => Cell::Int64(state.sum / state.count),
                    AggregateOp::Min => Cell::Int64(state.min.unwrap()),
                    AggregateOp::Max => Cell::Int64(state.max.unwrap()),
                };
                match key {
                    Some(group) => Tuple::new_from_cells(&[group.clone(), value]),
                    None => Tuple::new_from_cells(&[value]),
                }
            })
            .collect()
    }
}

#[derive(Default)]
struct BytesGroupState {
    count: i64,
    min: Option<Vec<u8>>,
    max: Option<Vec<u8>>,
}

/// Aggregates a `Bytes` field; only COUNT, MIN and MAX are defined.
pub struct BytesAggregator {
    agg_field: usize,
    group_by: Option<usize>,
    op: AggregateOp,
    groups: BTreeMap<Option<Cell>, BytesGroupState>,
}

impl BytesAggregator {
    pub fn new(agg_field: usize, group_by: Option<usize>, op: AggregateOp) -> Self {
        assert!(
            matches!(
                op,
                AggregateOp::Count | AggregateOp::Min | AggregateOp::Max
            ),
            "{:?} is not defined for bytes fields",
            op
        );

        Self {
            agg_field,
            group_by,
            op,
            groups: BTreeMap::new(),
        }
    }
}

impl Aggregator for BytesAggregator {
    fn merge(&mut self, tuple: &Tuple) {
        let value = match tuple.get_cell(self.agg_field) {
            Cell::Bytes(v) => v,
            cell => panic!("bytes aggregator fed with {:?}", cell),
        };

        let key = self.group_by.map(|i| tuple.get_cell(i));
        let state = self
            .groups
            .entry(key)
            .or_insert_with(BytesGroupState::default);
        state.count += 1;
        state.min = Some(match state.min.take() {
            Some(m) => m.min(value.clone()),
            None => value.clone(),
        });
        state.max = Some(match state.max.take() {
            Some(m) => m.max(value),
            None => value,
        });
    }

    fn results(&self) -> Vec<Tuple> {
        self.groups
            .iter()
            .map(|(key, state)| {
                let value = match self.op {
                    AggregateOp::Count => Cell::Int64(state.count),
                    AggregateOp::Min => Cell::Bytes(state.min.clone().unwrap()),
                    AggregateOp::Max => Cell::Bytes(state.max.clone().unwrap()),
                    _ => unreachable!(),
                };
                match key {
                    Some(group) => Tuple::new_from_cells(&[group.clone(), value]),
                    None => Tuple::new_from_cells(&[value]),
                }
            })
            .collect()
    }
}

/// Drains its child at construction, then yields one result tuple per
/// group (a single tuple when no grouping is requested).
pub struct Aggregate {
    results: std::vec::IntoIter<Tuple>,
}

impl Aggregate {
    pub fn new<I: Iterator<Item = WrappedTuple>>(
        child: I,
        schema: &Schema,
        agg_field: usize,
        group_by: Option<usize>,
        op: AggregateOp,
    ) -> Self {
        let mut aggregator: Box<dyn Aggregator> = match schema.get_field_type(agg_field) {
            Type::Int64 => Box::new(IntAggregator::new(agg_field, group_by, op)),
            Type::Bytes(_) => Box::new(BytesAggregator::new(agg_field, group_by, op)),
            t => panic!("no aggregator for field type {:?}", t),
        };

        for tuple in child {
            aggregator.merge(&tuple);
        }

        Aggregate {
            results: aggregator.results().into_iter(),
        }
    }
}

impl Iterator for Aggregate {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        self.results.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_tuple(cells: &[i64]) -> Tuple {
        let cells: Vec<Cell> = cells.iter().map(|v| Cell::Int64(*v)).collect();
        Tuple::new_from_cells(&cells)
    }

    #[test]
    fn test_int_aggregator_grouped_sum() {
        let mut agg = IntAggregator::new(1, Some(0), AggregateOp::Sum);
        agg.merge(&int_tuple(&[1, 10]));
        agg.merge(&int_tuple(&[1, 20]));
        agg.merge(&int_tuple(&[2, 5]));

        let results = agg.results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], int_tuple(&[1, 30]));
        assert_eq!(results[1], int_tuple(&[2, 5]));
    }

    #[test]
    fn test_int_aggregator_avg_truncates() {
        let mut agg = IntAggregator::new(0, None, AggregateOp::Avg);
        agg.merge(&int_tuple(&[3]));
        agg.merge(&int_tuple(&[4]));

        assert_eq!(agg.results(), vec![int_tuple(&[3])]);
    }

    #[test]
    fn test_bytes_aggregator_min_max() {
        let mut min = BytesAggregator::new(0, None, AggregateOp::Min);
        let mut max = BytesAggregator::new(0, None, AggregateOp::Max);
        for name in &["pear", "apple", "quince"] {
            let tuple = Tuple::new_from_cells(&[Cell::Bytes(name.as_bytes().to_vec())]);
            min.merge(&tuple);
            max.merge(&tuple);
        }

        assert_eq!(
            min.results(),
            vec![Tuple::new_from_cells(&[Cell::Bytes(b"apple".to_vec())])]
        );
        assert_eq!(
            max.results(),
            vec![Tuple::new_from_cells(&[Cell::Bytes(b"quince".to_vec())])]
        );
    }

    #[test]
    #[should_panic]
    fn test_bytes_aggregator_rejects_sum() {
        BytesAggregator::new(0, None, AggregateOp::Sum);
    }
}
