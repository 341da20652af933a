//! Record shapes and instance access.
//!
//! `#[derive(Record)]` generates everything in here for a struct. A hand-written [`Record`]
//! impl is equally valid and is how types that cannot use the derive register themselves.

use std::any::TypeId;

use chrono::{DateTime, Utc};

use crate::value::{Column, ColumnType, Value, ZeroCheck};

/// A composite value with named fields, possibly composed of other records.
pub trait Record: 'static {
    /// Declared shape of the type. Called once per type by the mapper cache.
    fn record_shape() -> RecordShape
    where
        Self: Sized;

    /// Shape of the concrete type behind a trait object.
    fn shape(&self) -> RecordShape;

    /// `TypeId` the shape is cached under. Wrappers report the type they wrap.
    fn static_type_id() -> TypeId
    where
        Self: Sized,
    {
        TypeId::of::<Self>()
    }

    /// `TypeId` of the concrete type behind a trait object.
    fn record_type_id(&self) -> TypeId;

    /// Leaf field at the given offset of this record's own declared fields.
    fn column(&self, offset: usize) -> Option<&dyn Column>;

    /// Embedded record at the given offset. `None` when the offset is not an embedded field or
    /// the embedded value is an empty optional.
    fn embedded(&self, offset: usize) -> Option<&dyn Record>;

    /// Writes a managed timestamp. Returns false when the record has no such field.
    fn set_timestamp(&mut self, _kind: TimestampKind, _at: DateTime<Utc>) -> bool {
        false
    }
}

/// Managed timestamp fields a record may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampKind {
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

/// Declared shape of one record type.
#[derive(Debug, Clone)]
pub struct RecordShape {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub table: Option<&'static str>,
    pub fields: Vec<FieldShape>,
}

impl RecordShape {
    pub fn new<T: 'static>(type_name: &'static str, fields: Vec<FieldShape>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name,
            table: None,
            fields,
        }
    }

    pub fn with_table(mut self, table: &'static str) -> Self {
        self.table = Some(table);
        self
    }
}

/// One declared field: its Rust name, its annotations, and what it holds.
#[derive(Debug, Clone)]
pub struct FieldShape {
    pub ident: &'static str,
    /// `(annotation key, raw annotation)` pairs, e.g. `("db", "id,omitempty")`.
    pub tags: &'static [(&'static str, &'static str)],
    pub kind: FieldKind,
    pub timestamp: Option<TimestampKind>,
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Column {
        zero: fn() -> Value,
        zero_check: ZeroCheck,
        nullable: bool,
    },
    Embedded {
        type_id: TypeId,
        // Deferred so that self-referential shapes do not recurse while being described.
        shape: fn() -> RecordShape,
        optional: bool,
    },
}

impl FieldShape {
    pub fn column<T: ColumnType>(ident: &'static str, tags: &'static [(&'static str, &'static str)]) -> Self {
        Self {
            ident,
            tags,
            kind: FieldKind::Column {
                zero: T::zero_value,
                zero_check: T::ZERO_CHECK,
                nullable: T::NULLABLE,
            },
            timestamp: None,
        }
    }

    pub fn embedded<E: EmbeddedRecord>(ident: &'static str, tags: &'static [(&'static str, &'static str)]) -> Self {
        Self {
            ident,
            tags,
            kind: FieldKind::Embedded {
                type_id: E::Target::static_type_id(),
                shape: E::Target::record_shape,
                optional: E::OPTIONAL,
            },
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, kind: TimestampKind) -> Self {
        self.timestamp = Some(kind);
        self
    }

    /// Raw annotation for `key`, if the field carries one.
    pub fn tag(&self, key: &str) -> Option<&'static str> {
        self.tags.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.kind, FieldKind::Embedded { .. })
    }
}

/// Field types that hold a composed record: the record itself, a box, or an optional one.
pub trait EmbeddedRecord {
    type Target: Record;
    const OPTIONAL: bool = false;

    fn as_record(&self) -> Option<&dyn Record>;
}

impl<T: Record> EmbeddedRecord for T {
    type Target = T;

    fn as_record(&self) -> Option<&dyn Record> {
        Some(self)
    }
}

impl<T: Record> Record for Box<T> {
    fn record_shape() -> RecordShape {
        T::record_shape()
    }

    fn static_type_id() -> TypeId {
        T::static_type_id()
    }

    fn shape(&self) -> RecordShape {
        (**self).shape()
    }

    fn record_type_id(&self) -> TypeId {
        (**self).record_type_id()
    }

    fn column(&self, offset: usize) -> Option<&dyn Column> {
        (**self).column(offset)
    }

    fn embedded(&self, offset: usize) -> Option<&dyn Record> {
        (**self).embedded(offset)
    }

    fn set_timestamp(&mut self, kind: TimestampKind, at: DateTime<Utc>) -> bool {
        (**self).set_timestamp(kind, at)
    }
}

impl<E: EmbeddedRecord> EmbeddedRecord for Option<E> {
    type Target = E::Target;
    const OPTIONAL: bool = true;

    fn as_record(&self) -> Option<&dyn Record> {
        self.as_ref().and_then(EmbeddedRecord::as_record)
    }
}

/// Inventory entry emitted by `#[derive(Record)]`.
pub struct RecordRegistration {
    pub type_name: &'static str,
    pub shape: fn() -> RecordShape,
}

inventory::collect!(RecordRegistration);

/// All record types registered through the derive in the final binary.
pub fn registered_records() -> impl Iterator<Item = &'static RecordRegistration> {
    inventory::iter::<RecordRegistration>()
}
