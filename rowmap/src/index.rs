//! Type index construction.
//!
//! A [`TypeIndex`] resolves external column names to field locations for one record type.
//! Embedded records are flattened depth-first into the parent namespace; when two fields
//! resolve to the same name the shallower one wins and equal-depth collisions are dropped
//! from the name table altogether.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::record::{FieldKind, Record, RecordShape, TimestampKind};
use crate::value::{Column, Value, ZeroCheck};

const TAG_SKIP: &str = "-";
const OPT_OMIT_EMPTY: &str = "omitempty";
const OPT_REQUIRED: &str = "required";

/// Maps a declared field name to a column name when the annotation does not supply one.
#[derive(Clone, Default)]
pub enum NameTransform {
    #[default]
    Identity,
    Lowercase,
    SnakeCase,
    Custom(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl NameTransform {
    pub fn custom(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn apply(&self, name: &str) -> String {
        match self {
            NameTransform::Identity => name.to_string(),
            NameTransform::Lowercase => name.to_lowercase(),
            NameTransform::SnakeCase => to_snake_case(name),
            NameTransform::Custom(f) => f(name),
        }
    }
}

impl fmt::Debug for NameTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameTransform::Identity => f.write_str("Identity"),
            NameTransform::Lowercase => f.write_str("Lowercase"),
            NameTransform::SnakeCase => f.write_str("SnakeCase"),
            NameTransform::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if i > 0 && chars[i - 1] != '_' && (prev_lower || (prev_upper && next_lower)) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Options that follow the column name in an annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagOptions {
    pub omit_empty: bool,
    pub required: bool,
    /// Unrecognized options, kept verbatim for callers that define their own.
    pub other: Vec<String>,
}

impl TagOptions {
    pub fn contains(&self, option: &str) -> bool {
        match option {
            OPT_OMIT_EMPTY => self.omit_empty,
            OPT_REQUIRED => self.required,
            other => self.other.iter().any(|o| o == other),
        }
    }
}

/// Splits `"<name>[,<option>...]"` into the (possibly empty) name and its options.
pub fn parse_tag(raw: &str) -> (&str, TagOptions) {
    let mut parts = raw.split(',');
    let name = parts.next().unwrap_or_default().trim();
    let mut options = TagOptions::default();
    for option in parts.map(str::trim).filter(|o| !o.is_empty()) {
        match option {
            OPT_OMIT_EMPTY => options.omit_empty = true,
            OPT_REQUIRED => options.required = true,
            other => options.other.push(other.to_string()),
        }
    }
    (name, options)
}

/// One resolvable field of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    /// Declared Rust name of the field.
    pub ident: &'static str,
    /// Field offsets from the root record down to this field.
    pub path: Vec<usize>,
    pub options: TagOptions,
    pub embedded: bool,
    /// Whether the field carries the mapper's annotation key.
    pub tagged: bool,
    pub depth: usize,
    pub zero: Value,
    pub zero_check: ZeroCheck,
    pub nullable: bool,
    pub timestamp: Option<TimestampKind>,
}

/// Optional behaviour resolved once per type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub created_at: bool,
    pub updated_at: bool,
    pub deleted_at: bool,
}

impl Capabilities {
    pub fn has(&self, kind: TimestampKind) -> bool {
        match kind {
            TimestampKind::CreatedAt => self.created_at,
            TimestampKind::UpdatedAt => self.updated_at,
            TimestampKind::DeletedAt => self.deleted_at,
        }
    }
}

/// Resolved name and traversal tables for one record type. Immutable once built.
#[derive(Debug, Clone)]
pub struct TypeIndex {
    type_id: TypeId,
    type_name: &'static str,
    table: Option<&'static str>,
    fields: Vec<FieldInfo>,
    names: BTreeMap<String, usize>,
    by_path: HashMap<Vec<usize>, usize>,
    capabilities: Capabilities,
}

impl TypeIndex {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table(&self) -> Option<&'static str> {
        self.table
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Field resolved under `name`, if the name is unique.
    pub fn get_by_path(&self, name: &str) -> Option<&FieldInfo> {
        self.names.get(name).map(|&i| &self.fields[i])
    }

    /// Field at the given offsets from the root.
    pub fn get_by_traversal(&self, path: &[usize]) -> Option<&FieldInfo> {
        self.by_path.get(path).map(|&i| &self.fields[i])
    }

    /// Resolved fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.names.values().map(|&i| &self.fields[i])
    }

    /// Every discovered field, including embedded records and names lost to collisions,
    /// in traversal order.
    pub fn all_fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Builds the index for `shape`, reading annotations under `annotation_key`.
pub fn build(shape: &RecordShape, annotation_key: &str, transform: &NameTransform) -> TypeIndex {
    let mut builder = IndexBuilder {
        annotation_key,
        transform,
        fields: Vec::new(),
    };
    let mut ancestors = vec![shape.type_id];
    builder.walk(shape, &mut Vec::new(), None, 0, &mut ancestors);

    let fields = builder.fields;
    let names = resolve_names(shape.type_name, &fields);
    let by_path = fields.iter().enumerate().map(|(i, f)| (f.path.clone(), i)).collect();

    let mut capabilities = Capabilities::default();
    for field in fields.iter().filter(|f| f.depth == 0) {
        match field.timestamp {
            Some(TimestampKind::CreatedAt) => capabilities.created_at = true,
            Some(TimestampKind::UpdatedAt) => capabilities.updated_at = true,
            Some(TimestampKind::DeletedAt) => capabilities.deleted_at = true,
            None => {}
        }
    }

    TypeIndex {
        type_id: shape.type_id,
        type_name: shape.type_name,
        table: shape.table,
        fields,
        names,
        by_path,
        capabilities,
    }
}

struct IndexBuilder<'a> {
    annotation_key: &'a str,
    transform: &'a NameTransform,
    fields: Vec<FieldInfo>,
}

impl IndexBuilder<'_> {
    fn walk(
        &mut self,
        shape: &RecordShape,
        path: &mut Vec<usize>,
        prefix: Option<&str>,
        depth: usize,
        ancestors: &mut Vec<TypeId>,
    ) {
        for (offset, field) in shape.fields.iter().enumerate() {
            let tag = field.tag(self.annotation_key);
            let (tag_name, options) = tag.map(parse_tag).unwrap_or_default();
            if tag_name == TAG_SKIP {
                continue;
            }

            let local = if tag_name.is_empty() {
                self.transform.apply(field.ident)
            } else {
                tag_name.to_string()
            };
            let name = match prefix {
                Some(prefix) => format!("{prefix}.{local}"),
                None => local,
            };

            path.push(offset);
            match &field.kind {
                FieldKind::Column {
                    zero,
                    zero_check,
                    nullable,
                } => self.fields.push(FieldInfo {
                    name,
                    ident: field.ident,
                    path: path.clone(),
                    options,
                    embedded: false,
                    tagged: tag.is_some(),
                    depth,
                    zero: zero(),
                    zero_check: *zero_check,
                    nullable: *nullable,
                    timestamp: field.timestamp,
                }),
                FieldKind::Embedded {
                    type_id,
                    shape: embedded_shape,
                    optional,
                } => {
                    // An unnamed embedded record promotes its fields; a named one prefixes them.
                    let child_prefix = if tag_name.is_empty() {
                        prefix.map(str::to_string)
                    } else {
                        Some(name.clone())
                    };
                    self.fields.push(FieldInfo {
                        name,
                        ident: field.ident,
                        path: path.clone(),
                        options,
                        embedded: true,
                        tagged: tag.is_some(),
                        depth,
                        zero: Value::Null,
                        zero_check: ZeroCheck::Equality,
                        nullable: *optional,
                        timestamp: None,
                    });

                    if ancestors.contains(type_id) {
                        log::debug!(
                            "{}: not descending into recursive embedded field `{}`",
                            shape.type_name,
                            field.ident
                        );
                    } else {
                        let child = embedded_shape();
                        ancestors.push(*type_id);
                        self.walk(&child, path, child_prefix.as_deref(), depth + 1, ancestors);
                        ancestors.pop();
                    }
                }
            }
            path.pop();
        }
    }
}

fn resolve_names(type_name: &str, fields: &[FieldInfo]) -> BTreeMap<String, usize> {
    // name -> (shallowest depth, fields seen at that depth)
    let mut candidates: BTreeMap<&str, (usize, Vec<usize>)> = BTreeMap::new();
    for (i, field) in fields.iter().enumerate().filter(|(_, f)| !f.embedded) {
        let entry = candidates.entry(field.name.as_str()).or_insert((field.depth, Vec::new()));
        if field.depth < entry.0 {
            *entry = (field.depth, vec![i]);
        } else if field.depth == entry.0 {
            entry.1.push(i);
        }
    }

    candidates
        .into_iter()
        .filter_map(|(name, (depth, seen))| match seen.as_slice() {
            [only] => Some((name.to_string(), *only)),
            _ => {
                log::debug!("{type_name}: column `{name}` is ambiguous at depth {depth}, dropping it");
                None
            }
        })
        .collect()
}

/// What a path points at on a live record.
pub enum FieldRead<'r> {
    Column(&'r dyn Column),
    Embedded(&'r dyn Record),
    /// An optional embedded record along the path is empty.
    Missing,
}

/// Follows `path` through `record`, whose type `index` describes. Returns `None` when the
/// path does not exist on the type.
pub fn read_path<'r>(index: &TypeIndex, record: &'r dyn Record, path: &[usize]) -> Option<FieldRead<'r>> {
    let (&last, parents) = path.split_last()?;
    let empty_embedded = |depth: usize| index.get_by_traversal(&path[..=depth]).is_some_and(|f| f.embedded);

    let mut current = record;
    for (depth, &offset) in parents.iter().enumerate() {
        match current.embedded(offset) {
            Some(next) => current = next,
            None => return empty_embedded(depth).then_some(FieldRead::Missing),
        }
    }

    if let Some(column) = current.column(last) {
        Some(FieldRead::Column(column))
    } else if let Some(embedded) = current.embedded(last) {
        Some(FieldRead::Embedded(embedded))
    } else {
        empty_embedded(parents.len()).then_some(FieldRead::Missing)
    }
}
