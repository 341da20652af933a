//! rowmap core library.
//!
//! Maps typed records to column/value projections and compiles predicate trees into
//! parameterized SQL fragments.
//!
//! ```
//! use rowmap::{Mapper, Record};
//!
//! #[derive(Record)]
//! #[rowmap(table = "accounts")]
//! struct Account {
//!     #[rowmap(db = "id,omitempty")]
//!     id: i64,
//!     #[rowmap(db = "name")]
//!     name: String,
//! }
//!
//! let mapper = Mapper::new();
//! let projection = mapper.map(&Account { id: 0, name: "joe".into() }).unwrap();
//! assert_eq!(projection.names, vec!["name"]);
//! ```

extern crate self as rowmap;

pub mod cond;
pub mod config;
pub mod errors;
pub mod index;
pub mod mapper;
pub mod project;
pub mod record;
pub mod statement;
pub mod value;

pub use cond::{Arg, Combinator, Compile, Expr, Fragment, Operand, Operator};
pub use config::RowmapConfig;
pub use errors::{Position, Result, RowmapError};
pub use index::{FieldInfo, NameTransform, TypeIndex};
pub use mapper::Mapper;
pub use project::{Input, MapOptions, Projection};
pub use record::{Record, RecordShape, TimestampKind};
pub use rowmap_macros::Record;
pub use statement::{Insert, PlaceholderFormat, Select, Stamp, Update, stamp};
pub use value::{Column, ColumnType, Json, Value};

// Re-exported for code generated by `#[derive(Record)]`.
pub use chrono;
pub use inventory;
