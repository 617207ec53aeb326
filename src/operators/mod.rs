pub mod aggregate;
pub mod delete;
pub mod filter;
pub mod insert;
pub mod seq_scan;
pub mod subset;

pub use aggregate::{Aggregate, AggregateOp, Aggregator, BytesAggregator, IntAggregator};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use seq_scan::SequentialScan;
pub use subset::SubsetIterator;
