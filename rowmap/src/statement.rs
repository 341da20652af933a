//! INSERT, UPDATE and SELECT assembly on top of projections and conditions.
//!
//! Statements compile to the same [`Fragment`] type as conditions. `Value::Default` renders
//! inline as `DEFAULT` and binds nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cond::{Compile, Expr, Fragment, MARKER};
use crate::errors::{Result, RowmapError};
use crate::mapper::Mapper;
use crate::project::Projection;
use crate::record::{Record, TimestampKind};
use crate::value::Value;

const DEFAULT_KEYWORD: &str = "DEFAULT";

/// Placeholder style of the final SQL text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderFormat {
    /// `?`, left as compiled.
    #[default]
    Question,
    /// `$1`, `$2`, ... in marker order; `??` becomes a literal `?`.
    Dollar,
}

impl Fragment {
    pub fn to_sql_with(&self, format: PlaceholderFormat) -> String {
        match format {
            PlaceholderFormat::Question => self.sql.clone(),
            PlaceholderFormat::Dollar => {
                let mut out = String::with_capacity(self.sql.len() + 8);
                let mut n = 0;
                let mut chars = self.sql.chars().peekable();
                while let Some(c) = chars.next() {
                    if c != MARKER {
                        out.push(c);
                    } else if chars.peek() == Some(&MARKER) {
                        chars.next();
                        out.push(MARKER);
                    } else {
                        n += 1;
                        out.push('$');
                        out.push_str(&n.to_string());
                    }
                }
                out
            }
        }
    }
}

// Renders one bound value, inlining DEFAULT.
fn bind(value: &Value, args: &mut Vec<Value>) -> String {
    if value.is_default() {
        DEFAULT_KEYWORD.to_string()
    } else {
        args.push(value.clone());
        MARKER.to_string()
    }
}

fn require_table(table: Option<&str>, statement: &str) -> Result<String> {
    match table {
        Some(table) if !table.is_empty() => Ok(table.to_string()),
        _ => Err(RowmapError::invalid_input(format!(
            "{statement} needs a table: declare #[rowmap(table = \"...\")] or call .into_table()"
        ))),
    }
}

/// `INSERT INTO <table> (<columns>) VALUES (...),(...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    table: Option<String>,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    returning: Vec<String>,
}

impl Insert {
    pub fn from_projection(projection: Projection) -> Self {
        Self {
            table: None,
            columns: projection.names,
            rows: vec![projection.values],
            returning: Vec::new(),
        }
    }

    /// Single-row insert of `record`'s default projection.
    pub fn record(mapper: &Mapper, record: &dyn Record) -> Result<Self> {
        let mut insert = Self::from_projection(mapper.map(record)?);
        insert.table = mapper.lookup_dyn(record).table().map(str::to_string);
        Ok(insert)
    }

    /// Multi-row insert. The first record's columns define the column list; every later
    /// record must project the same columns.
    pub fn records<'r>(mapper: &Mapper, records: impl IntoIterator<Item = &'r dyn Record>) -> Result<Self> {
        let mut records = records.into_iter();
        let first = records
            .next()
            .ok_or_else(|| RowmapError::invalid_input("cannot insert an empty list of records"))?;

        let mut insert = Self::record(mapper, first)?;
        for (i, record) in records.enumerate() {
            if insert.columns.is_empty() {
                // `DEFAULT VALUES` inserts exactly one row.
                return Err(RowmapError::invalid_input(
                    "records with no columns to insert can only be inserted one at a time",
                ));
            }
            let projection = mapper.map(record)?;
            if projection.names != insert.columns {
                return Err(RowmapError::invalid_input(format!(
                    "record {} projects columns [{}] but the insert has [{}]",
                    i + 1,
                    projection.names.join(", "),
                    insert.columns.join(", ")
                )));
            }
            insert.rows.push(projection.values);
        }
        Ok(insert)
    }

    pub fn into_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn returning<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.returning = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Compile for Insert {
    fn compile(&self) -> Result<Fragment> {
        let table = require_table(self.table.as_deref(), "INSERT")?;
        let mut args = Vec::new();

        let mut sql = format!("INSERT INTO {table} ");
        if self.columns.is_empty() {
            sql.push_str("DEFAULT VALUES");
        } else {
            let rows: Vec<String> = self
                .rows
                .iter()
                .map(|row| {
                    let values: Vec<String> = row.iter().map(|v| bind(v, &mut args)).collect();
                    format!("({})", values.join(","))
                })
                .collect();
            sql.push_str(&format!("({}) VALUES {}", self.columns.join(","), rows.join(",")));
        }
        append_returning(&mut sql, &self.returning);

        Ok(Fragment { sql, args })
    }
}

/// `UPDATE <table> SET <column> = ?, ... WHERE <condition>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    table: Option<String>,
    set: Vec<(String, Value)>,
    only: Option<Vec<String>>,
    filter: Option<Expr>,
    returning: Vec<String>,
}

impl Update {
    pub fn from_projection(projection: Projection) -> Self {
        Self {
            table: None,
            set: projection.names.into_iter().zip(projection.values).collect(),
            only: None,
            filter: None,
            returning: Vec::new(),
        }
    }

    /// Updates every projected column of `record` on rows matching `filter`.
    pub fn record(mapper: &Mapper, record: &dyn Record, filter: Expr) -> Result<Self> {
        let mut update = Self::from_projection(mapper.map(record)?);
        update.table = mapper.lookup_dyn(record).table().map(str::to_string);
        update.filter = Some(filter);
        Ok(update)
    }

    /// Restricts the SET list to the named columns. An empty list keeps every column.
    pub fn columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        self.only = (!columns.is_empty()).then_some(columns);
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn returning<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.returning = columns.into_iter().map(Into::into).collect();
        self
    }
}

impl Compile for Update {
    fn compile(&self) -> Result<Fragment> {
        let table = require_table(self.table.as_deref(), "UPDATE")?;
        let mut args = Vec::new();

        let assignments: Vec<String> = self
            .set
            .iter()
            .filter(|(column, _)| self.only.as_ref().is_none_or(|only| only.contains(column)))
            .map(|(column, value)| format!("{column} = {}", bind(value, &mut args)))
            .collect();
        if assignments.is_empty() {
            return Err(RowmapError::invalid_input(format!("UPDATE {table} has no columns to set")));
        }

        let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
        append_where(&mut sql, &mut args, self.filter.as_ref())?;
        append_returning(&mut sql, &self.returning);

        Ok(Fragment { sql, args })
    }
}

/// `SELECT <columns> FROM <table> [WHERE <condition>]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    columns: Vec<String>,
    table: Option<String>,
    filter: Option<Expr>,
}

impl Select {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            table: None,
            filter: None,
        }
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl Compile for Select {
    fn compile(&self) -> Result<Fragment> {
        let table = require_table(self.table.as_deref(), "SELECT")?;
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };

        let mut args = Vec::new();
        let mut sql = format!("SELECT {columns} FROM {table}");
        append_where(&mut sql, &mut args, self.filter.as_ref())?;
        Ok(Fragment { sql, args })
    }
}

fn append_where(sql: &mut String, args: &mut Vec<Value>, filter: Option<&Expr>) -> Result<()> {
    let Some(filter) = filter else {
        return Ok(());
    };
    let fragment = filter.compile()?;
    if !fragment.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&fragment.sql);
        args.extend(fragment.args);
    }
    Ok(())
}

fn append_returning(sql: &mut String, returning: &[String]) {
    if !returning.is_empty() {
        sql.push_str(" RETURNING ");
        sql.push_str(&returning.join(", "));
    }
}

/// Lifecycle event a record is being written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    Create,
    Update,
    Delete,
}

impl Stamp {
    fn kinds(self) -> &'static [TimestampKind] {
        match self {
            Stamp::Create => &[TimestampKind::CreatedAt, TimestampKind::UpdatedAt],
            Stamp::Update => &[TimestampKind::UpdatedAt],
            Stamp::Delete => &[TimestampKind::DeletedAt],
        }
    }
}

/// Sets the managed timestamps `event` implies on `record`. Returns how many were written.
pub fn stamp(mapper: &Mapper, record: &mut dyn Record, event: Stamp, now: DateTime<Utc>) -> usize {
    let capabilities = mapper.lookup_dyn(record).capabilities();
    event
        .kinds()
        .iter()
        .filter(|kind| capabilities.has(**kind))
        .filter(|kind| record.set_timestamp(**kind, now))
        .count()
}
