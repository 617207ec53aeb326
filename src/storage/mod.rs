pub mod cell;
pub mod schema;
pub mod tuple;

pub use cell::Cell;
pub use schema::{small_int_schema, FieldItem, Schema, Type};
pub use tuple::{Tuple, WrappedTuple};
