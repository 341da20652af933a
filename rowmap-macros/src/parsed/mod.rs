#[allow(unused_imports)]
use super::*;

mod field;
mod record;

pub(crate) use field::{ParsedField, TimestampFlag};
pub(crate) use record::ParsedRecord;
